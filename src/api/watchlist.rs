// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! The caller's coin watchlist.
//!
//! Listing enriches every row with live market data from a single
//! CoinGecko `coins/markets` call. When that call fails the rows are still
//! returned, just without price fields.

use std::collections::{BTreeMap, HashMap};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use url::form_urlencoded;

use super::market::validate_id;
use crate::{
    auth::Auth,
    error::ApiError,
    models::{
        AddToWatchlistRequest, BatchCheckRequest, ErrorResponse, MarketQuote,
        WatchlistCheckResponse, WatchlistCountResponse, WatchlistItem,
    },
    state::AppState,
    storage::{CryptoRepository, NewWatchlistEntry, StoredWatchlistEntry, WatchlistRepository},
};

#[utoipa::path(
    post,
    path = "/api/watchlist",
    request_body = AddToWatchlistRequest,
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = WatchlistItem),
        (status = 400, description = "Invalid coin id or name", body = ErrorResponse),
        (status = 409, description = "Coin already on the watchlist", body = ErrorResponse)
    )
)]
pub async fn add_to_watchlist(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<AddToWatchlistRequest>,
) -> Result<(StatusCode, Json<WatchlistItem>), ApiError> {
    validate_id(&request.coin_id)?;
    if request.coin_name.trim().is_empty() || request.symbol.trim().is_empty() {
        return Err(ApiError::bad_request("coinName and symbol are required"));
    }

    let entry = WatchlistRepository::new(&state.db).add(
        user.user_id,
        NewWatchlistEntry {
            coin_id: request.coin_id,
            coin_name: request.coin_name,
            symbol: request.symbol,
            image: request.image,
        },
    )?;
    tracing::debug!(user_id = user.user_id, coin_id = %entry.coin_id, "Coin added to watchlist");
    Ok((StatusCode::CREATED, Json(entry.into())))
}

#[utoipa::path(
    delete,
    path = "/api/watchlist/{coinId}",
    params(("coinId" = String, Path, description = "CoinGecko coin id")),
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The removed entry", body = WatchlistItem),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn remove_from_watchlist(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
) -> Result<Json<WatchlistItem>, ApiError> {
    let removed = WatchlistRepository::new(&state.db).remove(user.user_id, &coin_id)?;
    Ok(Json(removed.into()))
}

/// CoinGecko's largest `per_page`.
const MARKETS_PAGE_LIMIT: usize = 250;

/// Fetch market rows for `entries`, one request per 250 coins, keyed by coin id.
async fn market_quotes(
    state: &AppState,
    entries: &[StoredWatchlistEntry],
) -> Result<HashMap<String, MarketQuote>, ApiError> {
    let mut quotes = HashMap::with_capacity(entries.len());
    for chunk in entries.chunks(MARKETS_PAGE_LIMIT) {
        let ids = chunk
            .iter()
            .map(|e| e.coin_id.as_str())
            .collect::<Vec<_>>()
            .join(",");
        let query = form_urlencoded::Serializer::new(String::new())
            .append_pair("vs_currency", "usd")
            .append_pair("ids", &ids)
            .append_pair("per_page", &chunk.len().to_string())
            .append_pair("page", "1")
            .finish();

        let rows: Vec<MarketQuote> = state.coingecko.get("/coins/markets", &query).await?.json()?;
        quotes.extend(rows.into_iter().map(|q| (q.id.clone(), q)));
    }
    Ok(quotes)
}

#[utoipa::path(
    get,
    path = "/api/watchlist",
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Newest first", body = [WatchlistItem]))
)]
pub async fn list_watchlist(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<Vec<WatchlistItem>>, ApiError> {
    let entries = WatchlistRepository::new(&state.db).list(user.user_id)?;
    if entries.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let quotes = match market_quotes(&state, &entries).await {
        Ok(quotes) => quotes,
        Err(e) => {
            tracing::warn!(user_id = user.user_id, error = %e.message, "Watchlist price lookup failed");
            HashMap::new()
        }
    };

    let coin_ids: Vec<&str> = entries.iter().map(|e| e.coin_id.as_str()).collect();
    let snapshots = CryptoRepository::new(&state.db).get_many(&coin_ids)?;

    let items = entries
        .into_iter()
        .map(|entry| {
            let mut item = WatchlistItem::from(entry);
            if let Some(quote) = quotes.get(&item.coin_id) {
                item.apply_quote(quote);
            }
            if item.image.is_none() {
                item.image = snapshots.get(&item.coin_id).and_then(|c| c.image.clone());
            }
            item
        })
        .collect();
    Ok(Json(items))
}

#[utoipa::path(
    get,
    path = "/api/watchlist/check/{coinId}",
    params(("coinId" = String, Path, description = "CoinGecko coin id")),
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses((status = 200, body = WatchlistCheckResponse))
)]
pub async fn check_watchlist(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(coin_id): Path<String>,
) -> Result<Json<WatchlistCheckResponse>, ApiError> {
    let is_in_watchlist = WatchlistRepository::new(&state.db).contains(user.user_id, &coin_id)?;
    Ok(Json(WatchlistCheckResponse { is_in_watchlist }))
}

#[utoipa::path(
    post,
    path = "/api/watchlist/check-batch",
    request_body = BatchCheckRequest,
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses((status = 200, description = "Map of coin id to membership", body = BTreeMap<String, bool>))
)]
pub async fn check_watchlist_batch(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<BatchCheckRequest>,
) -> Result<Json<BTreeMap<String, bool>>, ApiError> {
    let membership =
        WatchlistRepository::new(&state.db).contains_many(user.user_id, &request.coin_ids)?;
    Ok(Json(membership))
}

#[utoipa::path(
    get,
    path = "/api/watchlist/count",
    tag = "Watchlist",
    security(("bearer_auth" = [])),
    responses((status = 200, body = WatchlistCountResponse))
)]
pub async fn watchlist_count(
    Auth(user): Auth,
    State(state): State<AppState>,
) -> Result<Json<WatchlistCountResponse>, ApiError> {
    let count = WatchlistRepository::new(&state.db).count(user.user_id)?;
    Ok(Json(WatchlistCountResponse { count }))
}
