// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Crypto Place - Market Data Portal API
//!
//! Proxies CoinGecko and CryptoCompare market data and serves user
//! accounts, posts and watchlists from an embedded redb database.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - JWT sessions, password hashing and Google / Azure AD login
//! - `providers` - Outbound HTTP clients (market data, AI assistant)
//! - `storage` - Embedded database and repositories

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod providers;
pub mod state;
pub mod storage;

use auth::{hash_password, PasswordError, Role};
use config::ConfigError;
use state::StateError;
use storage::{CryptoplaceDb, NewUser, StoreError, StoredUser, UserRepository};

/// Anything that stops the server from starting.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("database error: {0}")]
    Store(#[from] StoreError),

    #[error("failed to hash seed admin password: {0}")]
    Password(#[from] PasswordError),

    #[error("failed to build application state: {0}")]
    State(#[from] StateError),

    #[error("invalid bind address {0:?}")]
    BindAddress(String),

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create an `ADMIN` account for `email` unless one with that email exists.
///
/// Returns the created user, or `None` when the email was already taken.
pub fn seed_admin(
    db: &CryptoplaceDb,
    email: &str,
    password: &str,
) -> Result<Option<StoredUser>, StartupError> {
    let users = UserRepository::new(db);
    if users.find_by_email(email)?.is_some() {
        tracing::debug!(email = %email, "Seed admin already present");
        return Ok(None);
    }

    let user = users.create(NewUser {
        email: email.to_string(),
        name: "Administrator".to_string(),
        password_hash: Some(hash_password(password)?),
        role: Role::Admin,
    })?;
    tracing::info!(user_id = user.id, "Seeded admin account");
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::database::test_support::temp_db;

    #[test]
    fn seed_admin_runs_once() {
        let (db, _dir) = temp_db();

        let created = seed_admin(&db, "admin@example.com", "changeme").unwrap();
        assert_eq!(created.map(|u| u.role), Some(Role::Admin));

        let again = seed_admin(&db, "Admin@Example.com", "other").unwrap();
        assert!(again.is_none());
        assert_eq!(UserRepository::new(&db).list_all().unwrap().len(), 1);
    }
}
