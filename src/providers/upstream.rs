// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HTTP client for the market data vendors (CoinGecko, CryptoCompare).
//!
//! One outbound GET per call; no retries and no caching. The response body
//! is kept as raw bytes so handlers can relay it untouched.

use axum::body::Bytes;
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, StatusCode,
};
use serde::de::DeserializeOwned;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("failed to build {vendor} client: {reason}")]
    Client { vendor: &'static str, reason: String },

    #[error("{path} returned {status}")]
    Status {
        path: String,
        status: StatusCode,
        body: String,
    },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned an unexpected body: {reason}")]
    Decode { path: String, reason: String },
}

/// Raw upstream reply.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub path: String,
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Deserialize the body.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, UpstreamError> {
        serde_json::from_slice(&self.body).map_err(|e| UpstreamError::Decode {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }
}

/// A configured vendor endpoint.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    vendor: &'static str,
    base_url: String,
    http: Client,
}

impl UpstreamClient {
    pub fn new(
        vendor: &'static str,
        base_url: &str,
        headers: HeaderMap,
        timeout: std::time::Duration,
    ) -> Result<Self, UpstreamError> {
        let http = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| UpstreamError::Client {
                vendor,
                reason: e.to_string(),
            })?;
        Ok(Self {
            vendor,
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// CoinGecko client. The API key (if any) goes in the configured header.
    pub fn coingecko(config: &Config) -> Result<Self, UpstreamError> {
        let vendor = "coingecko";
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.coingecko_api_key {
            let name = HeaderName::from_bytes(config.coingecko_api_key_header.as_bytes())
                .map_err(|e| UpstreamError::Client {
                    vendor,
                    reason: format!("invalid API key header name: {e}"),
                })?;
            headers.insert(name, sensitive_value(vendor, key)?);
        }
        Self::new(
            vendor,
            &config.coingecko_api_url,
            headers,
            config.upstream_timeout,
        )
    }

    /// CryptoCompare client, authenticated with `authorization: Apikey <key>`.
    pub fn cryptocompare(config: &Config) -> Result<Self, UpstreamError> {
        let vendor = "cryptocompare";
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = &config.cryptocompare_api_key {
            headers.insert(AUTHORIZATION, sensitive_value(vendor, &format!("Apikey {key}"))?);
        }
        Self::new(
            vendor,
            &config.cryptocompare_api_url,
            headers,
            config.upstream_timeout,
        )
    }

    pub fn vendor(&self) -> &'static str {
        self.vendor
    }

    /// Issue `GET {base_url}{path}?{query}`.
    ///
    /// `query` is appended verbatim (already URL-encoded). Non-2xx replies
    /// become [`UpstreamError::Status`] carrying the upstream body.
    pub async fn get(&self, path: &str, query: &str) -> Result<UpstreamResponse, UpstreamError> {
        let mut url = format!("{}{path}", self.base_url);
        if !query.is_empty() {
            url.push('?');
            url.push_str(query);
        }

        let transport = |source| UpstreamError::Transport {
            path: path.to_string(),
            source,
        };
        let response = self.http.get(&url).send().await.map_err(transport)?;
        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(transport)?;

        if !status.is_success() {
            tracing::warn!(
                vendor = self.vendor,
                path,
                status = status.as_u16(),
                "Upstream request failed"
            );
            return Err(UpstreamError::Status {
                path: path.to_string(),
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        tracing::debug!(vendor = self.vendor, path, bytes = body.len(), "Upstream request succeeded");
        Ok(UpstreamResponse {
            path: path.to_string(),
            status,
            content_type,
            body,
        })
    }
}

fn sensitive_value(vendor: &'static str, value: &str) -> Result<HeaderValue, UpstreamError> {
    let mut value = HeaderValue::from_str(value).map_err(|e| UpstreamError::Client {
        vendor,
        reason: format!("invalid API key: {e}"),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
