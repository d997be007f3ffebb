// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Market data proxy endpoints.
//!
//! Each handler issues exactly one GET to CoinGecko or CryptoCompare and
//! relays status, `Content-Type` and body unchanged. Caller query
//! parameters are forwarded verbatim and in order; defaults are appended
//! only for keys the caller did not send.

use std::collections::HashSet;

use axum::{
    extract::{Path, RawQuery, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use url::form_urlencoded;

use crate::{error::ApiError, models::ErrorResponse, providers::UpstreamClient, state::AppState};

const MAX_ID_LEN: usize = 128;

const COINS_MARKETS_DEFAULTS: &[(&str, &str)] = &[
    ("vs_currency", "usd"),
    ("order", "market_cap_desc"),
    ("per_page", "100"),
    ("page", "1"),
];
const NFTS_LIST_DEFAULTS: &[(&str, &str)] = &[("order", "market_cap_usd_desc")];
const MARKET_CHART_DEFAULTS: &[(&str, &str)] = &[("vs_currency", "usd"), ("days", "30")];

/// Append `defaults` whose keys are absent from `raw`, keeping `raw` intact.
pub fn forward_query(raw: Option<&str>, defaults: &[(&str, &str)]) -> String {
    let raw = raw.unwrap_or("");
    let present: HashSet<String> = form_urlencoded::parse(raw.as_bytes())
        .map(|(key, _)| key.into_owned())
        .collect();

    let mut extra = form_urlencoded::Serializer::new(String::new());
    let mut appended = false;
    for (key, value) in defaults {
        if !present.contains(*key) {
            extra.append_pair(key, value);
            appended = true;
        }
    }

    let mut query = raw.to_string();
    if appended {
        if !query.is_empty() {
            query.push('&');
        }
        query.push_str(&extra.finish());
    }
    query
}

/// Accept only `[A-Za-z0-9_.-]{1,128}` before placing an id in a URL path.
pub fn validate_id(id: &str) -> Result<&str, ApiError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'.' | b'-'));
    if valid && id != "." && id != ".." {
        Ok(id)
    } else {
        Err(ApiError::bad_request(format!("Invalid id: {id:?}")))
    }
}

async fn relay(client: &UpstreamClient, path: &str, query: &str) -> Result<Response, ApiError> {
    let upstream = client.get(path, query).await?;
    let mut response = (upstream.status, upstream.body).into_response();
    if let Some(content_type) = upstream.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    Ok(response)
}

#[utoipa::path(
    get,
    path = "/api/coins/markets",
    tag = "Market",
    description = "CoinGecko `/coins/markets`. Defaults: vs_currency=usd, order=market_cap_desc, per_page=100, page=1.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn coins_markets(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let query = forward_query(query.as_deref(), COINS_MARKETS_DEFAULTS);
    relay(&state.coingecko, "/coins/markets", &query).await
}

#[utoipa::path(
    get,
    path = "/api/coins/{id}",
    tag = "Market",
    params(("id" = String, Path, description = "CoinGecko coin id, e.g. bitcoin")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn coin_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let id = validate_id(&id)?;
    let query = forward_query(query.as_deref(), &[]);
    relay(&state.coingecko, &format!("/coins/{id}"), &query).await
}

#[utoipa::path(
    get,
    path = "/api/coins/{id}/market_chart",
    tag = "Market",
    description = "CoinGecko `/coins/{id}/market_chart`. Defaults: vs_currency=usd, days=30.",
    params(("id" = String, Path, description = "CoinGecko coin id")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn coin_market_chart(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let id = validate_id(&id)?;
    let query = forward_query(query.as_deref(), MARKET_CHART_DEFAULTS);
    relay(&state.coingecko, &format!("/coins/{id}/market_chart"), &query).await
}

#[utoipa::path(
    get,
    path = "/api/nfts/list",
    tag = "Market",
    description = "CoinGecko `/nfts/list`. Default: order=market_cap_usd_desc.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn nfts_list(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let query = forward_query(query.as_deref(), NFTS_LIST_DEFAULTS);
    relay(&state.coingecko, "/nfts/list", &query).await
}

#[utoipa::path(
    get,
    path = "/api/nfts/{id}",
    tag = "Market",
    params(("id" = String, Path, description = "CoinGecko NFT collection id")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn nft_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = validate_id(&id)?;
    relay(&state.coingecko, &format!("/nfts/{id}"), "").await
}

#[utoipa::path(
    get,
    path = "/api/news",
    tag = "Market",
    description = "CryptoCompare `/news/v1/article/list`.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn news(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let query = forward_query(query.as_deref(), &[]);
    relay(&state.cryptocompare, "/news/v1/article/list", &query).await
}

#[utoipa::path(
    get,
    path = "/api/crypto-details",
    tag = "Market",
    description = "CoinGecko `/coins`.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn crypto_details(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let query = forward_query(query.as_deref(), &[]);
    relay(&state.coingecko, "/coins", &query).await
}

#[utoipa::path(
    get,
    path = "/api/crypto-details/chart/{id}",
    tag = "Market",
    description = "CoinGecko `/coins/{id}/market_chart`. Defaults: vs_currency=usd, days=30.",
    params(("id" = String, Path, description = "CoinGecko coin id")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn crypto_details_chart(
    state: State<AppState>,
    id: Path<String>,
    query: RawQuery,
) -> Result<Response, ApiError> {
    coin_market_chart(state, id, query).await
}

#[utoipa::path(
    get,
    path = "/api/crypto-market-list",
    tag = "Market",
    description = "CoinGecko `/exchanges`.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn crypto_market_list(
    state: State<AppState>,
    query: RawQuery,
) -> Result<Response, ApiError> {
    exchanges(state, query).await
}

#[utoipa::path(
    get,
    path = "/api/exchanges",
    tag = "Market",
    description = "CoinGecko `/exchanges`.",
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn exchanges(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let query = forward_query(query.as_deref(), &[]);
    relay(&state.coingecko, "/exchanges", &query).await
}

#[utoipa::path(
    get,
    path = "/api/exchanges/{id}",
    tag = "Market",
    params(("id" = String, Path, description = "Exchange id, e.g. binance")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn exchange_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = validate_id(&id)?;
    relay(&state.coingecko, &format!("/exchanges/{id}"), "").await
}

#[utoipa::path(
    get,
    path = "/api/exchanges/{id}/tickers",
    tag = "Market",
    params(("id" = String, Path, description = "Exchange id")),
    responses(
        (status = 200, description = "Upstream JSON relayed unchanged"),
        (status = 400, description = "Invalid id", body = ErrorResponse),
        (status = "default", description = "Upstream failure", body = ErrorResponse)
    )
)]
pub async fn exchange_tickers(
    State(state): State<AppState>,
    Path(id): Path<String>,
    RawQuery(query): RawQuery,
) -> Result<Response, ApiError> {
    let id = validate_id(&id)?;
    let query = forward_query(query.as_deref(), &[]);
    relay(&state.coingecko, &format!("/exchanges/{id}/tickers"), &query).await
}
