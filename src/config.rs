// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! [`Config`] struct loaded once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `5001` |
//! | `DATA_DIR` | Directory holding the redb database file | `./data` |
//! | `JWT_SECRET` | HS256 signing secret | Required |
//! | `JWT_ISSUER` | `iss` claim of issued tokens | `cryptoplace` |
//! | `JWT_EXPIRES_IN_SECS` | Token lifetime | `86400` |
//! | `COINGECKO_API_URL` | CoinGecko base URL | `https://api.coingecko.com/api/v3` |
//! | `COINGECKO_API_KEY` | CoinGecko key | Optional |
//! | `COINGECKO_API_KEY_HEADER` | Header carrying the CoinGecko key | `x-cg-demo-api-key` |
//! | `CRYPTOCOMPARE_API_URL` | CryptoCompare base URL | `https://data-api.cryptocompare.com` |
//! | `CRYPTOCOMPARE_API_KEY` | CryptoCompare key | Optional |
//! | `UPSTREAM_TIMEOUT_SECS` | Proxy request timeout | `10` |
//! | `CORS_ORIGIN` | Comma-separated allowed origins (`*` = any) | `http://localhost:3000,http://localhost:5173` |
//! | `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET` | Google OAuth client | Optional |
//! | `GOOGLE_REDIRECT_URI` | Google OAuth callback | `http://localhost:5001/api/auth/google/callback` |
//! | `AZURE_AD_CLIENT_ID` / `AZURE_AD_CLIENT_SECRET` / `AZURE_AD_TENANT_ID` | Azure AD app | Optional |
//! | `AZURE_AD_CLOUD_INSTANCE` | Azure authority host | `https://login.microsoftonline.com/` |
//! | `AZURE_AD_REDIRECT_URI` | Azure AD callback | `http://localhost:5001/api/auth/azure/callback` |
//! | `FRONTEND_URL` | Where OAuth logins redirect with the token | Optional |
//! | `CHAINLIT_SERVICE_URL` | AI chat service | `http://localhost:8000` |
//! | `SEED_ADMIN_EMAIL` / `SEED_ADMIN_PASSWORD` | Bootstrap admin account | Optional |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | Serve HTTPS when both are set | Optional |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::{env, path::PathBuf, time::Duration};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the database directory.
///
/// The server keeps a single `cryptoplace.redb` file in this directory.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const JWT_SECRET_ENV: &str = "JWT_SECRET";
pub const JWT_ISSUER_ENV: &str = "JWT_ISSUER";
pub const JWT_EXPIRES_ENV: &str = "JWT_EXPIRES_IN_SECS";
pub const COINGECKO_URL_ENV: &str = "COINGECKO_API_URL";
pub const COINGECKO_KEY_ENV: &str = "COINGECKO_API_KEY";
pub const COINGECKO_KEY_HEADER_ENV: &str = "COINGECKO_API_KEY_HEADER";
pub const CRYPTOCOMPARE_URL_ENV: &str = "CRYPTOCOMPARE_API_URL";
pub const CRYPTOCOMPARE_KEY_ENV: &str = "CRYPTOCOMPARE_API_KEY";
pub const UPSTREAM_TIMEOUT_ENV: &str = "UPSTREAM_TIMEOUT_SECS";
pub const CORS_ORIGIN_ENV: &str = "CORS_ORIGIN";
pub const FRONTEND_URL_ENV: &str = "FRONTEND_URL";
pub const CHAINLIT_URL_ENV: &str = "CHAINLIT_SERVICE_URL";
pub const SEED_ADMIN_EMAIL_ENV: &str = "SEED_ADMIN_EMAIL";
pub const SEED_ADMIN_PASSWORD_ENV: &str = "SEED_ADMIN_PASSWORD";
pub const TLS_CERT_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_PORT: u16 = 5001;
pub const DEFAULT_COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const DEFAULT_COINGECKO_KEY_HEADER: &str = "x-cg-demo-api-key";
pub const DEFAULT_CRYPTOCOMPARE_URL: &str = "https://data-api.cryptocompare.com";
pub const DEFAULT_CORS_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";
pub const DEFAULT_CHAINLIT_URL: &str = "http://localhost:8000";
pub const DEFAULT_AZURE_CLOUD_INSTANCE: &str = "https://login.microsoftonline.com/";
pub const DEFAULT_GOOGLE_REDIRECT: &str = "http://localhost:5001/api/auth/google/callback";
pub const DEFAULT_AZURE_REDIRECT: &str = "http://localhost:5001/api/auth/azure/callback";

/// Shortest accepted `JWT_SECRET` in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 16;

#[cfg(feature = "dev")]
const DEV_JWT_SECRET: &str = "cryptoplace-development-secret";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Google OAuth client registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleOAuthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

/// Azure AD (Entra ID) application registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AzureAdConfig {
    pub client_id: String,
    pub client_secret: String,
    pub tenant_id: String,
    pub cloud_instance: String,
    pub redirect_uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// Process configuration, read once from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_expires_in: Duration,
    pub coingecko_api_url: String,
    pub coingecko_api_key: Option<String>,
    pub coingecko_api_key_header: String,
    pub cryptocompare_api_url: String,
    pub cryptocompare_api_key: Option<String>,
    pub upstream_timeout: Duration,
    pub cors_origins: Vec<String>,
    pub google: Option<GoogleOAuthConfig>,
    pub azure_ad: Option<AzureAdConfig>,
    pub frontend_url: Option<String>,
    pub chainlit_service_url: String,
    pub seed_admin: Option<(String, String)>,
    pub tls: Option<TlsConfig>,
    pub log_format: LogFormat,
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    ///
    /// Blank values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let jwt_secret = match get(JWT_SECRET_ENV) {
            Some(secret) => secret,
            None => default_jwt_secret()?,
        };
        if jwt_secret.len() < MIN_JWT_SECRET_LEN {
            return Err(ConfigError::Invalid {
                key: JWT_SECRET_ENV,
                value: "<redacted>".to_string(),
                reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
            });
        }

        let google = match (get("GOOGLE_CLIENT_ID"), get("GOOGLE_CLIENT_SECRET")) {
            (Some(client_id), Some(client_secret)) => Some(GoogleOAuthConfig {
                client_id,
                client_secret,
                redirect_uri: or("GOOGLE_REDIRECT_URI", DEFAULT_GOOGLE_REDIRECT),
            }),
            _ => None,
        };

        let azure_ad = match (
            get("AZURE_AD_CLIENT_ID"),
            get("AZURE_AD_CLIENT_SECRET"),
            get("AZURE_AD_TENANT_ID"),
        ) {
            (Some(client_id), Some(client_secret), Some(tenant_id)) => Some(AzureAdConfig {
                client_id,
                client_secret,
                tenant_id,
                cloud_instance: or("AZURE_AD_CLOUD_INSTANCE", DEFAULT_AZURE_CLOUD_INSTANCE),
                redirect_uri: or("AZURE_AD_REDIRECT_URI", DEFAULT_AZURE_REDIRECT),
            }),
            _ => None,
        };

        let seed_admin = match (get(SEED_ADMIN_EMAIL_ENV), get(SEED_ADMIN_PASSWORD_ENV)) {
            (Some(email), Some(password)) => Some((email, password)),
            _ => None,
        };

        let tls = match (get(TLS_CERT_ENV), get(TLS_KEY_ENV)) {
            (Some(cert), Some(key)) => Some(TlsConfig {
                cert_path: PathBuf::from(cert),
                key_path: PathBuf::from(key),
            }),
            _ => None,
        };

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            None | Some("pretty") => LogFormat::Pretty,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: LOG_FORMAT_ENV,
                    value: other.to_string(),
                    reason: "expected `json` or `pretty`".to_string(),
                })
            }
        };

        Ok(Self {
            host: or(HOST_ENV, "0.0.0.0"),
            port: parse_or(PORT_ENV, get(PORT_ENV), DEFAULT_PORT)?,
            data_dir: PathBuf::from(or(DATA_DIR_ENV, "./data")),
            jwt_secret,
            jwt_issuer: or(JWT_ISSUER_ENV, "cryptoplace"),
            jwt_expires_in: Duration::from_secs(parse_or(
                JWT_EXPIRES_ENV,
                get(JWT_EXPIRES_ENV),
                86_400u64,
            )?),
            coingecko_api_url: or(COINGECKO_URL_ENV, DEFAULT_COINGECKO_URL),
            coingecko_api_key: get(COINGECKO_KEY_ENV),
            coingecko_api_key_header: or(COINGECKO_KEY_HEADER_ENV, DEFAULT_COINGECKO_KEY_HEADER),
            cryptocompare_api_url: or(CRYPTOCOMPARE_URL_ENV, DEFAULT_CRYPTOCOMPARE_URL),
            cryptocompare_api_key: get(CRYPTOCOMPARE_KEY_ENV),
            upstream_timeout: Duration::from_secs(parse_or(
                UPSTREAM_TIMEOUT_ENV,
                get(UPSTREAM_TIMEOUT_ENV),
                10u64,
            )?),
            cors_origins: split_origins(&or(CORS_ORIGIN_ENV, DEFAULT_CORS_ORIGINS)),
            google,
            azure_ad,
            frontend_url: get(FRONTEND_URL_ENV).map(|u| u.trim_end_matches('/').to_string()),
            chainlit_service_url: or(CHAINLIT_URL_ENV, DEFAULT_CHAINLIT_URL),
            seed_admin,
            tls,
            log_format,
        })
    }

    /// Path of the redb database file inside [`Config::data_dir`].
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join("cryptoplace.redb")
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    /// Local-development defaults with a fixed secret. Used by tests.
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            data_dir: PathBuf::from("./data"),
            jwt_secret: "test-secret-that-is-long-enough".to_string(),
            jwt_issuer: "cryptoplace".to_string(),
            jwt_expires_in: Duration::from_secs(86_400),
            coingecko_api_url: DEFAULT_COINGECKO_URL.to_string(),
            coingecko_api_key: None,
            coingecko_api_key_header: DEFAULT_COINGECKO_KEY_HEADER.to_string(),
            cryptocompare_api_url: DEFAULT_CRYPTOCOMPARE_URL.to_string(),
            cryptocompare_api_key: None,
            upstream_timeout: Duration::from_secs(10),
            cors_origins: split_origins(DEFAULT_CORS_ORIGINS),
            google: None,
            azure_ad: None,
            frontend_url: None,
            chainlit_service_url: DEFAULT_CHAINLIT_URL.to_string(),
            seed_admin: None,
            tls: None,
            log_format: LogFormat::Pretty,
        }
    }
}

#[cfg(feature = "dev")]
fn default_jwt_secret() -> Result<String, ConfigError> {
    Ok(DEV_JWT_SECRET.to_string())
}

#[cfg(not(feature = "dev"))]
fn default_jwt_secret() -> Result<String, ConfigError> {
    Err(ConfigError::Missing(JWT_SECRET_ENV))
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
    }
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}
