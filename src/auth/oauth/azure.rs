// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Azure AD (Entra ID) login with PKCE.

use reqwest::Client;
use serde::Deserialize;
use url::form_urlencoded;

use super::{
    pkce, random_state, AuthorizationRequest, IdentityProvider, OAuthError, OAUTH_HTTP_TIMEOUT,
};
use crate::config::AzureAdConfig;
use crate::storage::{AccountProvider, ExternalIdentity};

const SCOPES: &str = "openid profile email";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: Option<String>,
}

/// Identity claims of an Azure AD id token.
#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    oid: Option<String>,
    sub: Option<String>,
    preferred_username: Option<String>,
    email: Option<String>,
    upn: Option<String>,
    name: Option<String>,
}

impl IdTokenClaims {
    fn into_identity(self) -> Result<ExternalIdentity, OAuthError> {
        let subject = self
            .oid
            .or(self.sub)
            .ok_or(OAuthError::MissingClaim("oid"))?;
        let email = self
            .preferred_username
            .or(self.email)
            .or(self.upn)
            .ok_or(OAuthError::MissingClaim("preferred_username"))?;
        let name = self.name.unwrap_or_else(|| email.clone());
        // preferred_username and upn are tenant-controlled, not verified mailboxes
        Ok(ExternalIdentity {
            provider: AccountProvider::AzureAd,
            subject,
            email,
            name,
            email_verified: false,
        })
    }
}

pub struct AzureAdOAuth {
    config: AzureAdConfig,
    http: Client,
    authority: String,
}

impl AzureAdOAuth {
    pub fn new(config: AzureAdConfig) -> Result<Self, OAuthError> {
        let http = Client::builder()
            .timeout(OAUTH_HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Client(e.to_string()))?;
        let authority = format!(
            "{}/{}",
            config.cloud_instance.trim_end_matches('/'),
            config.tenant_id
        );
        Ok(Self {
            config,
            http,
            authority,
        })
    }

    /// Use a different authority host (sovereign clouds, tests).
    pub fn with_authority(mut self, authority: String) -> Self {
        self.authority = authority.trim_end_matches('/').to_string();
        self
    }
}

impl IdentityProvider for AzureAdOAuth {
    fn provider(&self) -> AccountProvider {
        AccountProvider::AzureAd
    }

    fn authorization_request(&self) -> AuthorizationRequest {
        let state = random_state();
        let verifier = pkce::generate_verifier();
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", SCOPES)
            .append_pair("state", &state)
            .append_pair("code_challenge", &pkce::challenge(&verifier))
            .append_pair("code_challenge_method", "S256")
            .finish();

        AuthorizationRequest {
            url: format!("{}/oauth2/v2.0/authorize?{query}", self.authority),
            state,
            pkce_verifier: Some(verifier),
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> Result<ExternalIdentity, OAuthError> {
        let verifier = pkce_verifier.ok_or(OAuthError::MissingClaim("code_verifier"))?;
        let form = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
            ("code_verifier", verifier),
            ("scope", SCOPES),
        ];
        let response = self
            .http
            .post(format!("{}/oauth2/v2.0/token", self.authority))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected { status, body });
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("token response: {e}")))?;
        let id_token = token.id_token.ok_or(OAuthError::MissingClaim("id_token"))?;

        // Received directly from the token endpoint over TLS
        let claims = jsonwebtoken::dangerous::insecure_decode::<IdTokenClaims>(&id_token)
            .map_err(|e| OAuthError::InvalidResponse(format!("id_token: {e}")))?
            .claims;
        claims.into_identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use mockito::Matcher;

    fn config() -> AzureAdConfig {
        AzureAdConfig {
            client_id: "aid".to_string(),
            client_secret: "asecret".to_string(),
            tenant_id: "tenant-1".to_string(),
            cloud_instance: "https://login.microsoftonline.com/".to_string(),
            redirect_uri: "http://localhost:5001/api/auth/azure/callback".to_string(),
        }
    }

    /// Unsigned id token carrying `claims`.
    fn id_token(claims: &str) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims);
        format!("{header}.{payload}.c2ln")
    }

    #[test]
    fn authorization_url_uses_tenant_and_pkce() {
        let azure = AzureAdOAuth::new(config()).unwrap();
        let request = azure.authorization_request();

        assert!(request
            .url
            .starts_with("https://login.microsoftonline.com/tenant-1/oauth2/v2.0/authorize?"));
        let url = url::Url::parse(&request.url).unwrap();
        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        let verifier = request.pkce_verifier.unwrap();
        assert_eq!(pairs["code_challenge"], pkce::challenge(&verifier));
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert_eq!(pairs["response_mode"], "query");
        assert_eq!(pairs["state"], request.state);
    }

    #[tokio::test]
    async fn exchange_code_reads_id_token_claims() {
        let mut server = mockito::Server::new_async().await;
        let body = serde_json::json!({
            "access_token": "at",
            "id_token": id_token(r#"{"oid":"oid-7","sub":"s","upn":"bob@corp.test","name":"Bob"}"#),
        });
        let token = server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("code".into(), "auth-code".into()),
                Matcher::UrlEncoded("code_verifier".into(), "the-verifier".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let azure = AzureAdOAuth::new(config())
            .unwrap()
            .with_authority(format!("{}/tenant-1", server.url()));
        let identity = azure
            .exchange_code("auth-code", Some("the-verifier"))
            .await
            .unwrap();

        assert_eq!(identity.subject, "oid-7");
        assert_eq!(identity.email, "bob@corp.test");
        assert_eq!(identity.name, "Bob");
        assert!(!identity.email_verified);
        token.assert_async().await;
    }

    #[test]
    fn claims_prefer_oid_and_preferred_username() {
        let claims: IdTokenClaims = serde_json::from_str(
            r#"{"oid":"o","sub":"s","preferred_username":"p@x","email":"e@x","upn":"u@x"}"#,
        )
        .unwrap();
        let identity = claims.into_identity().unwrap();
        assert_eq!(identity.subject, "o");
        assert_eq!(identity.email, "p@x");
        assert_eq!(identity.name, "p@x");
    }

    #[test]
    fn claims_without_email_are_rejected() {
        let claims: IdTokenClaims = serde_json::from_str(r#"{"sub":"s"}"#).unwrap();
        assert!(matches!(
            claims.into_identity(),
            Err(OAuthError::MissingClaim("preferred_username"))
        ));
    }

    #[tokio::test]
    async fn missing_verifier_is_rejected_before_any_request() {
        let azure = AzureAdOAuth::new(config()).unwrap();
        assert!(matches!(
            azure.exchange_code("code", None).await,
            Err(OAuthError::MissingClaim("code_verifier"))
        ));
    }
}
