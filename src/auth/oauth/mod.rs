// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # External Identity Providers
//!
//! Authorization-code logins through Google and Azure AD (Entra ID), both
//! spoken over plain HTTPS with `reqwest`.
//!
//! ## Flow
//!
//! 1. `GET /api/auth/{provider}` asks the provider for an
//!    [`AuthorizationRequest`], remembers its `state` (and PKCE verifier) in
//!    [`PendingAuthorizations`], and redirects the browser.
//! 2. The provider redirects back to `/api/auth/{provider}/callback` with
//!    `code` and `state`.
//! 3. The callback takes the pending entry (single use, 10 minute TTL) and
//!    calls [`IdentityProvider::exchange_code`] to obtain an
//!    [`ExternalIdentity`].

pub mod azure;
pub mod google;
pub mod pkce;

use std::{
    future::Future,
    num::NonZeroUsize,
    time::{Duration, Instant},
};

use lru::LruCache;
use tokio::sync::Mutex;

use crate::storage::{AccountProvider, ExternalIdentity};

pub use azure::AzureAdOAuth;
pub use google::GoogleOAuth;

/// HTTP timeout for token and userinfo calls.
pub const OAUTH_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// How long a started login may take before its `state` expires.
pub const PENDING_TTL: Duration = Duration::from_secs(10 * 60);

/// Maximum number of logins in flight; the oldest are evicted first.
const PENDING_CAPACITY: usize = 1024;

#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to identity provider failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("identity provider returned {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("identity provider response was invalid: {0}")]
    InvalidResponse(String),

    #[error("identity provider response is missing {0}")]
    MissingClaim(&'static str),
}

/// Where to send the browser, plus the secrets the callback will need.
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    pub state: String,
    pub pkce_verifier: Option<String>,
}

/// A vendor login adapter.
pub trait IdentityProvider: Send + Sync {
    fn provider(&self) -> AccountProvider;

    /// Build the authorize URL with a fresh random `state`.
    fn authorization_request(&self) -> AuthorizationRequest;

    /// Redeem an authorization code and read the caller's identity.
    fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: Option<&str>,
    ) -> impl Future<Output = Result<ExternalIdentity, OAuthError>> + Send;
}

/// Random opaque value for the OAuth `state` parameter.
pub fn random_state() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[derive(Debug, Clone)]
struct PendingAuthorization {
    provider: AccountProvider,
    pkce_verifier: Option<String>,
    started_at: Instant,
}

/// Logins that were redirected to a provider and have not come back yet.
pub struct PendingAuthorizations {
    entries: Mutex<LruCache<String, PendingAuthorization>>,
    ttl: Duration,
}

impl Default for PendingAuthorizations {
    fn default() -> Self {
        Self::new(PENDING_TTL)
    }
}

impl PendingAuthorizations {
    pub fn new(ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(PENDING_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        }
    }

    /// Remember a started login.
    pub async fn insert(&self, request: &AuthorizationRequest, provider: AccountProvider) {
        let mut entries = self.entries.lock().await;
        entries.put(
            request.state.clone(),
            PendingAuthorization {
                provider,
                pkce_verifier: request.pkce_verifier.clone(),
                started_at: Instant::now(),
            },
        );
    }

    /// Consume the entry for `state`.
    ///
    /// Returns the PKCE verifier (if any) when `state` is known, belongs to
    /// `provider` and has not expired. The entry is removed either way.
    pub async fn take(&self, state: &str, provider: AccountProvider) -> Option<Option<String>> {
        let pending = self.entries.lock().await.pop(state)?;
        if pending.provider != provider || pending.started_at.elapsed() > self.ttl {
            return None;
        }
        Some(pending.pkce_verifier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(state: &str, verifier: Option<&str>) -> AuthorizationRequest {
        AuthorizationRequest {
            url: "https://idp.test/authorize".to_string(),
            state: state.to_string(),
            pkce_verifier: verifier.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn state_is_single_use() {
        let pending = PendingAuthorizations::default();
        pending
            .insert(&request("s1", Some("verifier")), AccountProvider::AzureAd)
            .await;

        assert_eq!(
            pending.take("s1", AccountProvider::AzureAd).await,
            Some(Some("verifier".to_string()))
        );
        assert_eq!(pending.take("s1", AccountProvider::AzureAd).await, None);
    }

    #[tokio::test]
    async fn unknown_state_is_rejected() {
        let pending = PendingAuthorizations::default();
        assert_eq!(pending.take("nope", AccountProvider::Google).await, None);
    }

    #[tokio::test]
    async fn state_of_other_provider_is_rejected() {
        let pending = PendingAuthorizations::default();
        pending.insert(&request("s1", None), AccountProvider::Google).await;
        assert_eq!(pending.take("s1", AccountProvider::AzureAd).await, None);
    }

    #[tokio::test]
    async fn expired_state_is_rejected() {
        let pending = PendingAuthorizations::new(Duration::ZERO);
        pending.insert(&request("s1", None), AccountProvider::Google).await;
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(pending.take("s1", AccountProvider::Google).await, None);
    }

    #[test]
    fn random_state_is_unique() {
        assert_ne!(random_state(), random_state());
        assert_eq!(random_state().len(), 32);
    }
}
