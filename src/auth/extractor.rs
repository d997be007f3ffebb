// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authenticated users.
//!
//! Use the `Auth` extractor in handlers to require authentication:
//!
//! ```rust,ignore
//! async fn my_handler(Auth(user): Auth) -> impl IntoResponse {
//!     // user is AuthenticatedUser
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthenticatedUser};
use crate::state::AppState;
use crate::storage::{StoreError, UserRepository};

/// Extractor for authenticated users.
///
/// Verifies the bearer token, then loads the account it names. Tokens of
/// deleted or deactivated accounts are rejected even before they expire.
///
/// # Example
///
/// ```rust,ignore
/// async fn list_watchlist(
///     Auth(user): Auth,
///     State(state): State<AppState>,
/// ) -> Result<Json<Vec<WatchlistItem>>, ApiError> {
///     // user.user_id contains the authenticated user's ID
///     // user.role contains their current role
/// }
/// ```
pub struct Auth(pub AuthenticatedUser);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        // Extract Authorization header
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingAuthHeader)?
            .to_str()
            .map_err(|_| AuthError::InvalidAuthHeader)?;

        // Extract Bearer token
        let token = auth_header
            .strip_prefix("Bearer ")
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::InvalidAuthHeader)?;

        let claims = state.jwt.verify(token)?;
        let mut user = AuthenticatedUser::from_claims(claims).ok_or(AuthError::MalformedToken)?;

        let stored = match UserRepository::new(&state.db).get(user.user_id) {
            Ok(stored) => stored,
            Err(StoreError::NotFound(_)) => return Err(AuthError::UnknownUser),
            Err(e) => return Err(AuthError::InternalError(e.to_string())),
        };
        if !stored.is_active {
            tracing::debug!(user_id = user.user_id, "Rejected token of inactive account");
            return Err(AuthError::AccountDisabled);
        }

        // The stored account is authoritative for role and email
        user.role = stored.role;
        user.email = stored.email;
        Ok(Auth(user))
    }
}

/// Extractor that requires admin role.
pub struct AdminOnly(pub AuthenticatedUser);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let Auth(user) = Auth::from_request_parts(parts, state).await?;

        if !user.is_admin() {
            return Err(AuthError::InsufficientPermissions);
        }

        Ok(AdminOnly(user))
    }
}
