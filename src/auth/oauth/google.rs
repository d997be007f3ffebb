// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Google OAuth 2.0 login.

use reqwest::Client;
use serde::Deserialize;
use url::form_urlencoded;

use super::{random_state, AuthorizationRequest, IdentityProvider, OAuthError, OAUTH_HTTP_TIMEOUT};
use crate::config::GoogleOAuthConfig;
use crate::storage::{AccountProvider, ExternalIdentity};

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v3/userinfo";
const SCOPES: &str = "openid email profile";

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    email: Option<String>,
    #[serde(default)]
    email_verified: Option<bool>,
    name: Option<String>,
}

pub struct GoogleOAuth {
    config: GoogleOAuthConfig,
    http: Client,
    token_url: String,
    userinfo_url: String,
}

impl GoogleOAuth {
    pub fn new(config: GoogleOAuthConfig) -> Result<Self, OAuthError> {
        let http = Client::builder()
            .timeout(OAUTH_HTTP_TIMEOUT)
            .build()
            .map_err(|e| OAuthError::Client(e.to_string()))?;
        Ok(Self {
            config,
            http,
            token_url: TOKEN_URL.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        })
    }

    /// Point token and userinfo calls at different hosts.
    pub fn with_endpoints(mut self, token_url: String, userinfo_url: String) -> Self {
        self.token_url = token_url;
        self.userinfo_url = userinfo_url;
        self
    }
}

impl IdentityProvider for GoogleOAuth {
    fn provider(&self) -> AccountProvider {
        AccountProvider::Google
    }

    fn authorization_request(&self) -> AuthorizationRequest {
        let state = random_state();
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", SCOPES)
            .append_pair("state", &state)
            .append_pair("access_type", "offline")
            .append_pair("prompt", "select_account")
            .finish();

        AuthorizationRequest {
            url: format!("{AUTHORIZE_URL}?{query}"),
            state,
            pkce_verifier: None,
        }
    }

    async fn exchange_code(
        &self,
        code: &str,
        _pkce_verifier: Option<&str>,
    ) -> Result<ExternalIdentity, OAuthError> {
        let form = [
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ];
        let response = self.http.post(&self.token_url).form(&form).send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected { status, body });
        }
        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("token response: {e}")))?;

        let response = self
            .http
            .get(&self.userinfo_url)
            .bearer_auth(&token.access_token)
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected { status, body });
        }
        let info: UserInfo = response
            .json()
            .await
            .map_err(|e| OAuthError::InvalidResponse(format!("userinfo response: {e}")))?;

        if info.email_verified == Some(false) {
            return Err(OAuthError::MissingClaim("verified email"));
        }
        let email = info.email.ok_or(OAuthError::MissingClaim("email"))?;
        let name = info.name.unwrap_or_else(|| email.clone());

        Ok(ExternalIdentity {
            provider: AccountProvider::Google,
            subject: info.sub,
            email,
            name,
            email_verified: info.email_verified == Some(true),
        })
    }
}
