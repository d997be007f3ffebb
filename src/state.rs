// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::api::employee::seed_employee;
use crate::auth::oauth::{AzureAdOAuth, GoogleOAuth, OAuthError, PendingAuthorizations};
use crate::auth::JwtKeys;
use crate::config::Config;
use crate::models::Employee;
use crate::providers::{ChatClient, ChatError, UpstreamClient, UpstreamError};
use crate::storage::CryptoplaceDb;

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Chat(#[from] ChatError),

    #[error(transparent)]
    OAuth(#[from] OAuthError),
}

/// Shared application state, built once at startup.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<CryptoplaceDb>,
    pub jwt: Arc<JwtKeys>,
    pub coingecko: Arc<UpstreamClient>,
    pub cryptocompare: Arc<UpstreamClient>,
    pub chat: Arc<ChatClient>,
    /// `None` when Google login is not configured
    pub google: Option<Arc<GoogleOAuth>>,
    /// `None` when Azure AD login is not configured
    pub azure: Option<Arc<AzureAdOAuth>>,
    pub pending_logins: Arc<PendingAuthorizations>,
    pub employee: Arc<RwLock<Employee>>,
    /// Where OAuth logins land with `?token=`; JSON is returned when unset
    pub frontend_url: Option<String>,
}

impl AppState {
    pub fn from_config(config: &Config, db: CryptoplaceDb) -> Result<Self, StateError> {
        let google = config
            .google
            .clone()
            .map(GoogleOAuth::new)
            .transpose()?
            .map(Arc::new);
        let azure = config
            .azure_ad
            .clone()
            .map(AzureAdOAuth::new)
            .transpose()?
            .map(Arc::new);

        Ok(Self {
            db: Arc::new(db),
            jwt: Arc::new(JwtKeys::new(
                &config.jwt_secret,
                config.jwt_issuer.clone(),
                config.jwt_expires_in,
            )),
            coingecko: Arc::new(UpstreamClient::coingecko(config)?),
            cryptocompare: Arc::new(UpstreamClient::cryptocompare(config)?),
            chat: Arc::new(ChatClient::new(&config.chainlit_service_url)?),
            google,
            azure,
            pending_logins: Arc::new(PendingAuthorizations::default()),
            employee: Arc::new(RwLock::new(seed_employee())),
            frontend_url: config.frontend_url.clone(),
        })
    }
}
