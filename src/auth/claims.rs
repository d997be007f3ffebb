// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! JWT claims and authenticated user representation.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::roles::Role;

/// How the session behind a token was established.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum LoginType {
    Password,
    Google,
    AzureAd,
}

/// Claims carried by tokens this server issues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id, as a decimal string
    pub sub: String,
    pub email: String,
    pub role: Role,
    pub login_type: LoginType,
    /// Issuer (`JWT_ISSUER`)
    pub iss: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
}

/// Authenticated user information extracted from a verified token.
///
/// This is the primary type used throughout the application to represent
/// the authenticated user making a request. `role` reflects the stored
/// account, not the possibly stale claim.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    pub login_type: LoginType,

    /// Token expiration (Unix timestamp, not serialized)
    #[serde(skip)]
    pub expires_at: i64,
}

impl AuthenticatedUser {
    /// Create from verified claims. Returns `None` if `sub` is not a user id.
    pub fn from_claims(claims: Claims) -> Option<Self> {
        let user_id = claims.sub.parse().ok()?;
        Some(Self {
            user_id,
            email: claims.email,
            role: claims.role,
            login_type: claims.login_type,
            expires_at: claims.exp,
        })
    }

    /// Check if the user has the required role.
    pub fn has_role(&self, required: Role) -> bool {
        self.role.has_privilege(required)
    }

    /// Check if this user is an admin.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Whether this user may modify a resource owned by `owner_id`.
    pub fn can_modify(&self, owner_id: u64) -> bool {
        self.user_id == owner_id || self.is_admin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_claims() -> Claims {
        Claims {
            sub: "42".to_string(),
            email: "alice@example.com".to_string(),
            role: Role::Admin,
            login_type: LoginType::AzureAd,
            iss: "cryptoplace".to_string(),
            iat: 1700000000,
            exp: 1700003600,
        }
    }

    #[test]
    fn from_claims_extracts_user_id() {
        let user = AuthenticatedUser::from_claims(sample_claims()).unwrap();
        assert_eq!(user.user_id, 42);
        assert_eq!(user.expires_at, 1700003600);
    }

    #[test]
    fn from_claims_rejects_non_numeric_subject() {
        let mut claims = sample_claims();
        claims.sub = "user_abc".to_string();
        assert!(AuthenticatedUser::from_claims(claims).is_none());
    }

    #[test]
    fn login_type_serializes_kebab_case() {
        let json = serde_json::to_value(sample_claims()).unwrap();
        assert_eq!(json["login_type"], "azure-ad");
        assert_eq!(json["role"], "ADMIN");
    }

    #[test]
    fn owner_or_admin_can_modify() {
        let mut user = AuthenticatedUser::from_claims(sample_claims()).unwrap();
        assert!(user.has_role(Role::User));
        assert!(user.can_modify(7));

        user.role = Role::User;
        assert!(user.can_modify(42));
        assert!(!user.can_modify(7));
    }
}
