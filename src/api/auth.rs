// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Account endpoints: password registration and login, the caller's
//! profile, and the Google / Azure AD redirect flows.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use url::form_urlencoded;

use crate::{
    auth::{
        hash_password,
        oauth::{AzureAdOAuth, GoogleOAuth, IdentityProvider},
        verify_password, Auth, AuthError, LoginType, Role,
    },
    error::ApiError,
    models::{AuthResponse, ErrorResponse, LoginRequest, OAuthCallbackQuery, RegisterRequest, UserResponse},
    state::AppState,
    storage::{AccountProvider, NewUser, StoredUser, UserRepository},
};

const MIN_PASSWORD_LEN: usize = 6;

/// Argon2 is CPU bound; keep it off the async workers.
async fn hash_off_runtime(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

async fn verify_off_runtime(password: String, hash: String) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(ApiError::internal)?
        .map_err(ApiError::from)
}

fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate_registration(request: &RegisterRequest) -> Result<(), ApiError> {
    if !looks_like_email(request.email.trim()) {
        return Err(ApiError::bad_request("A valid email is required"));
    }
    if request.name.trim().is_empty() {
        return Err(ApiError::bad_request("Name is required"));
    }
    if request.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn auth_response(state: &AppState, user: StoredUser, login_type: LoginType) -> Result<AuthResponse, ApiError> {
    let access_token = state.jwt.issue(&user, login_type)?;
    Ok(AuthResponse {
        access_token,
        user: user.into(),
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    tag = "Auth",
    responses(
        (status = 201, body = AuthResponse),
        (status = 400, description = "Invalid email, name or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    validate_registration(&request)?;

    let users = UserRepository::new(&state.db);
    if users.find_by_email(&request.email)?.is_some() {
        return Err(ApiError::conflict("Email is already registered"));
    }

    let password_hash = hash_off_runtime(request.password).await?;
    let user = users.create(NewUser {
        email: request.email,
        name: request.name.trim().to_string(),
        password_hash: Some(password_hash),
        role: Role::User,
    })?;

    let response = auth_response(&state, user, LoginType::Password)?;
    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    tag = "Auth",
    responses(
        (status = 200, body = AuthResponse),
        (status = 401, description = "Invalid credentials or disabled account", body = ErrorResponse)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_email(&request.email)?
        .ok_or(AuthError::InvalidCredentials)?;

    // Accounts created through Google or Azure AD have no password
    let hash = user
        .password_hash
        .clone()
        .ok_or(AuthError::InvalidCredentials)?;
    if !verify_off_runtime(request.password, hash).await? {
        tracing::debug!(user_id = user.id, "Password login rejected");
        return Err(AuthError::InvalidCredentials.into());
    }
    if !user.is_active {
        return Err(AuthError::AccountDisabled.into());
    }

    tracing::info!(user_id = user.id, "User logged in");
    Ok(Json(auth_response(&state, user, LoginType::Password)?))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    tag = "Auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    )
)]
pub async fn profile(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<UserResponse>, ApiError> {
    let stored = UserRepository::new(&state.db).get(user.user_id)?;
    Ok(Json(stored.into()))
}

fn not_configured(provider: AccountProvider) -> ApiError {
    ApiError::service_unavailable(format!("{} login is not configured", provider.as_str()))
}

async fn start_login<P: IdentityProvider>(state: &AppState, provider: &P) -> Redirect {
    let request = provider.authorization_request();
    state.pending_logins.insert(&request, provider.provider()).await;
    Redirect::temporary(&request.url)
}

/// Finish a vendor login: check `state`, redeem `code`, resolve the local
/// account and hand out a session token.
async fn complete_login<P: IdentityProvider>(
    state: &AppState,
    provider: &P,
    query: OAuthCallbackQuery,
) -> Result<Response, ApiError> {
    let vendor = provider.provider();
    let returned_state = query
        .state
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("Missing state parameter"))?;
    let pkce_verifier = state
        .pending_logins
        .take(returned_state, vendor)
        .await
        .ok_or_else(|| ApiError::bad_request("Unknown or expired login state"))?;

    if let Some(error) = query.error {
        tracing::warn!(provider = vendor.as_str(), error = %error, "Provider returned an error");
        let details = query.error_description.unwrap_or(error);
        return Err(ApiError::new(StatusCode::UNAUTHORIZED, "External login failed").with_details(details));
    }
    let code = query
        .code
        .as_deref()
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing code parameter"))?;

    let identity = provider.exchange_code(code, pkce_verifier.as_deref()).await?;
    let user = UserRepository::new(&state.db).upsert_external(&identity)?;
    if !user.is_active {
        return Err(AuthError::AccountDisabled.into());
    }

    let login_type = match vendor {
        AccountProvider::Google => LoginType::Google,
        AccountProvider::AzureAd => LoginType::AzureAd,
    };
    tracing::info!(user_id = user.id, provider = vendor.as_str(), "External login completed");
    let response = auth_response(state, user, login_type)?;

    match &state.frontend_url {
        Some(frontend) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("token", &response.access_token)
                .finish();
            let target = format!("{}/auth/callback?{query}", frontend.trim_end_matches('/'));
            Ok(Redirect::temporary(&target).into_response())
        }
        None => Ok(Json(response).into_response()),
    }
}

fn google(state: &AppState) -> Result<std::sync::Arc<GoogleOAuth>, ApiError> {
    state
        .google
        .clone()
        .ok_or_else(|| not_configured(AccountProvider::Google))
}

fn azure(state: &AppState) -> Result<std::sync::Arc<AzureAdOAuth>, ApiError> {
    state
        .azure
        .clone()
        .ok_or_else(|| not_configured(AccountProvider::AzureAd))
}

#[utoipa::path(
    get,
    path = "/api/auth/google",
    tag = "Auth",
    responses(
        (status = 307, description = "Redirect to Google"),
        (status = 503, description = "Google login is not configured", body = ErrorResponse)
    )
)]
pub async fn google_login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let provider = google(&state)?;
    Ok(start_login(&state, provider.as_ref()).await)
}

#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    params(OAuthCallbackQuery),
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in (no FRONTEND_URL configured)", body = AuthResponse),
        (status = 307, description = "Redirect to the frontend with the token"),
        (status = 400, description = "Unknown or expired state", body = ErrorResponse),
        (status = 401, description = "Login refused", body = ErrorResponse)
    )
)]
pub async fn google_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, ApiError> {
    let provider = google(&state)?;
    complete_login(&state, provider.as_ref(), query).await
}

#[utoipa::path(
    get,
    path = "/api/auth/azure",
    tag = "Auth",
    responses(
        (status = 307, description = "Redirect to Azure AD"),
        (status = 503, description = "Azure AD login is not configured", body = ErrorResponse)
    )
)]
pub async fn azure_login(State(state): State<AppState>) -> Result<Redirect, ApiError> {
    let provider = azure(&state)?;
    Ok(start_login(&state, provider.as_ref()).await)
}

#[utoipa::path(
    get,
    path = "/api/auth/azure/callback",
    params(OAuthCallbackQuery),
    tag = "Auth",
    responses(
        (status = 200, description = "Logged in (no FRONTEND_URL configured)", body = AuthResponse),
        (status = 307, description = "Redirect to the frontend with the token"),
        (status = 400, description = "Unknown or expired state", body = ErrorResponse),
        (status = 401, description = "Login refused", body = ErrorResponse)
    )
)]
pub async fn azure_callback(
    State(state): State<AppState>,
    Query(query): Query<OAuthCallbackQuery>,
) -> Result<Response, ApiError> {
    let provider = azure(&state)?;
    complete_login(&state, provider.as_ref(), query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AzureAdConfig, Config, GoogleOAuthConfig};
    use crate::state::test_support::{create_user, test_state, test_state_with, TEST_PASSWORD};
    use axum::{body::to_bytes, http::header::LOCATION};
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
    use std::sync::Arc;

    fn register_request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            name: "Alice".to_string(),
            password: password.to_string(),
        }
    }

    fn google_config() -> GoogleOAuthConfig {
        GoogleOAuthConfig {
            client_id: "gid".into(),
            client_secret: "gsecret".into(),
            redirect_uri: "http://localhost:5001/api/auth/google/callback".into(),
        }
    }

    fn state_param(location: &str) -> String {
        url::Url::parse(location)
            .unwrap()
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn email_shape() {
        assert!(looks_like_email("alice@example.com"));
        assert!(!looks_like_email("alice"));
        assert!(!looks_like_email("@example.com"));
        assert!(!looks_like_email("alice@example"));
        assert!(!looks_like_email("a lice@example.com"));
        assert!(!looks_like_email("a@b@example.com"));
    }

    #[tokio::test]
    async fn register_then_login() {
        let (state, _dir) = test_state();

        let (status, Json(registered)) = register(
            State(state.clone()),
            Json(register_request("alice@example.com", "secret1")),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(registered.user.role, Role::User);

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "Alice@Example.com".into(),
                password: "secret1".into(),
            }),
        )
        .await
        .unwrap();
        let claims = state.jwt.verify(&logged_in.access_token).unwrap();
        assert_eq!(claims.sub, registered.user.id.to_string());
        assert_eq!(claims.login_type, LoginType::Password);
    }

    #[tokio::test]
    async fn register_rejects_bad_input_and_duplicates() {
        let (state, _dir) = test_state();

        let err = register(State(state.clone()), Json(register_request("nope", "secret1")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err = register(State(state.clone()), Json(register_request("a@example.com", "12345")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        create_user(&state, "taken@example.com", Role::User);
        let err = register(State(state), Json(register_request("taken@example.com", "secret1")))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_share_401() {
        let (state, _dir) = test_state();
        create_user(&state, "bob@example.com", Role::User);

        let wrong = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "bob@example.com".into(),
                password: "not-it".into(),
            }),
        )
        .await
        .unwrap_err();
        let unknown = login(
            State(state),
            Json(LoginRequest {
                email: "ghost@example.com".into(),
                password: TEST_PASSWORD.into(),
            }),
        )
        .await
        .unwrap_err();

        assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown.status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.message, unknown.message);
    }

    #[tokio::test]
    async fn disabled_account_cannot_log_in() {
        let (state, _dir) = test_state();
        let user = create_user(&state, "carol@example.com", Role::User);
        UserRepository::new(&state.db).set_active(user.id, false).unwrap();

        let err = login(
            State(state),
            Json(LoginRequest {
                email: "carol@example.com".into(),
                password: TEST_PASSWORD.into(),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unconfigured_provider_is_unavailable() {
        let (state, _dir) = test_state();
        let err = google_login(State(state.clone())).await.unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
        let err = azure_callback(State(state), Query(OAuthCallbackQuery::default()))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn callback_with_unknown_state_is_bad_request() {
        let config = Config {
            google: Some(google_config()),
            ..Config::default()
        };
        let (state, _dir) = test_state_with(config);

        let err = google_callback(
            State(state),
            Query(OAuthCallbackQuery {
                code: Some("code".into()),
                state: Some("never-issued".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn provider_error_is_unauthorized() {
        let config = Config {
            google: Some(google_config()),
            ..Config::default()
        };
        let (state, _dir) = test_state_with(config);

        let redirect = google_login(State(state.clone())).await.unwrap().into_response();
        let location = redirect.headers()[LOCATION].to_str().unwrap().to_string();

        let err = google_callback(
            State(state),
            Query(OAuthCallbackQuery {
                state: Some(state_param(&location)),
                error: Some("access_denied".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn google_round_trip_creates_user_and_redirects_to_frontend() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at-1"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(r#"{"sub":"g-1","email":"dave@example.com","email_verified":true,"name":"Dave"}"#)
            .create_async()
            .await;

        let config = Config {
            frontend_url: Some("http://localhost:3000/".into()),
            ..Config::default()
        };
        let (mut state, _dir) = test_state_with(config);
        state.google = Some(Arc::new(
            GoogleOAuth::new(google_config())
                .unwrap()
                .with_endpoints(format!("{}/token", server.url()), format!("{}/userinfo", server.url())),
        ));

        let redirect = google_login(State(state.clone())).await.unwrap().into_response();
        assert_eq!(redirect.status(), StatusCode::TEMPORARY_REDIRECT);
        let location = redirect.headers()[LOCATION].to_str().unwrap().to_string();
        assert!(location.starts_with("https://accounts.google.com/"));
        let login_state = state_param(&location);

        let response = google_callback(
            State(state.clone()),
            Query(OAuthCallbackQuery {
                code: Some("auth-code".into()),
                state: Some(login_state.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
        let target = response.headers()[LOCATION].to_str().unwrap();
        assert!(target.starts_with("http://localhost:3000/auth/callback?token="));

        let token = target.split_once("token=").unwrap().1;
        let claims = state.jwt.verify(token).unwrap();
        assert_eq!(claims.login_type, LoginType::Google);
        let user = UserRepository::new(&state.db)
            .find_by_email("dave@example.com")
            .unwrap()
            .unwrap();
        assert_eq!(user.google_id.as_deref(), Some("g-1"));

        // The state is single use
        let replay = google_callback(
            State(state),
            Query(OAuthCallbackQuery {
                code: Some("auth-code".into()),
                state: Some(login_state),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(replay.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn callback_without_frontend_returns_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token":"at-2"}"#)
            .create_async()
            .await;
        server
            .mock("GET", "/userinfo")
            .with_status(200)
            .with_body(r#"{"sub":"g-2","email":"erin@example.com","name":"Erin"}"#)
            .create_async()
            .await;

        let (mut state, _dir) = test_state();
        state.google = Some(Arc::new(
            GoogleOAuth::new(google_config())
                .unwrap()
                .with_endpoints(format!("{}/token", server.url()), format!("{}/userinfo", server.url())),
        ));
        let redirect = google_login(State(state.clone())).await.unwrap().into_response();
        let location = redirect.headers()[LOCATION].to_str().unwrap().to_string();

        let response = google_callback(
            State(state),
            Query(OAuthCallbackQuery {
                code: Some("auth-code".into()),
                state: Some(state_param(&location)),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: AuthResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(body.user.email, "erin@example.com");
        assert!(body.user.google_linked);
        assert!(!body.user.has_password);
    }

    #[tokio::test]
    async fn azure_login_cannot_claim_existing_admin_email() {
        let mut server = mockito::Server::new_async().await;
        let claims = URL_SAFE_NO_PAD
            .encode(r#"{"oid":"foreign-oid","preferred_username":"Admin@Example.com","name":"Eve"}"#);
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        server
            .mock("POST", "/tenant-1/oauth2/v2.0/token")
            .with_status(200)
            .with_body(serde_json::json!({ "id_token": format!("{header}.{claims}.c2ln") }).to_string())
            .create_async()
            .await;

        let (mut state, _dir) = test_state();
        let admin = create_user(&state, "admin@example.com", Role::Admin);
        state.azure = Some(Arc::new(
            AzureAdOAuth::new(AzureAdConfig {
                client_id: "aid".into(),
                client_secret: "asecret".into(),
                tenant_id: "tenant-1".into(),
                cloud_instance: "https://login.microsoftonline.com".into(),
                redirect_uri: "http://localhost:5001/api/auth/azure/callback".into(),
            })
            .unwrap()
            .with_authority(format!("{}/tenant-1", server.url())),
        ));

        let redirect = azure_login(State(state.clone())).await.unwrap().into_response();
        let location = redirect.headers()[LOCATION].to_str().unwrap().to_string();

        let err = azure_callback(
            State(state.clone()),
            Query(OAuthCallbackQuery {
                code: Some("auth-code".into()),
                state: Some(state_param(&location)),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::CONFLICT);

        let stored = UserRepository::new(&state.db).get(admin.id).unwrap();
        assert!(stored.azure_id.is_none());
        assert_eq!(UserRepository::new(&state.db).list_all().unwrap().len(), 1);
    }
}
