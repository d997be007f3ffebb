// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! This module defines the request and response data structures used by
//! the REST API. All types derive `Serialize` or `Deserialize` and
//! `ToSchema` for JSON handling and OpenAPI documentation. Field names are
//! camelCase on the wire, except `access_token`.
//!
//! ## Model Categories
//!
//! - **Auth**: Registration, login and the user profile
//! - **Posts**: User-authored posts with manual ordering
//! - **Watchlist**: Saved coins, enriched with live prices when listed
//! - **Employee**: The in-process employee record
//! - **AI**: Chat assistant requests and replies

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::Role;
use crate::providers::ChatContext;
use crate::storage::{StoredPost, StoredUser, StoredWatchlistEntry};

/// Error body returned by every failing endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable summary, never empty
    pub error: String,
    /// Upstream body or transport error, when relaying a vendor failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

// =============================================================================
// Auth
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    /// At least 6 characters
    pub password: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Public view of a user account.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: u64,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    /// Whether the account can sign in with a password
    pub has_password: bool,
    pub google_linked: bool,
    pub azure_linked: bool,
    pub created_at: DateTime<Utc>,
}

impl From<StoredUser> for UserResponse {
    fn from(user: StoredUser) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            has_password: user.password_hash.is_some(),
            google_linked: user.google_id.is_some(),
            azure_linked: user.azure_id.is_some(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserResponse,
}

/// Query parameters of an OAuth provider callback.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by the provider when the user declined or the request was invalid
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Posts
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
}

/// Move the post at `sourceIndex` to `targetIndex` (0-based, within the
/// caller's posts ordered by `order`).
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReorderPostsRequest {
    pub source_index: usize,
    pub target_index: usize,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ListPostsQuery {
    /// Only posts written by this user
    #[serde(alias = "authorId")]
    pub author_id: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: u64,
    pub author_id: u64,
    pub title: String,
    pub content: Option<String>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<StoredPost> for PostResponse {
    fn from(post: StoredPost) -> Self {
        Self {
            id: post.id,
            author_id: post.author_id,
            title: post.title,
            content: post.content,
            order: post.order,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

// =============================================================================
// Watchlist
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddToWatchlistRequest {
    /// CoinGecko coin id, e.g. `bitcoin`
    pub coin_id: String,
    pub coin_name: String,
    pub symbol: String,
    pub image: Option<String>,
}

/// A watchlist row, with live market fields when the price lookup succeeded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistItem {
    pub id: u64,
    pub user_id: u64,
    pub coin_id: String,
    pub coin_name: String,
    pub symbol: String,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    /// 24h change in percent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_change_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_cap_rank: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub high_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_24h: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<String>,
}

impl From<StoredWatchlistEntry> for WatchlistItem {
    fn from(entry: StoredWatchlistEntry) -> Self {
        Self {
            id: entry.id,
            user_id: entry.user_id,
            coin_id: entry.coin_id,
            coin_name: entry.coin_name,
            symbol: entry.symbol,
            image: entry.image,
            created_at: entry.created_at,
            current_price: None,
            price_change_24h: None,
            market_cap: None,
            market_cap_rank: None,
            high_24h: None,
            low_24h: None,
            last_updated: None,
        }
    }
}

/// The subset of a CoinGecko `coins/markets` row used for enrichment.
#[derive(Debug, Clone, Deserialize)]
pub struct MarketQuote {
    pub id: String,
    pub current_price: Option<f64>,
    pub price_change_percentage_24h: Option<f64>,
    pub market_cap: Option<f64>,
    pub market_cap_rank: Option<u32>,
    pub high_24h: Option<f64>,
    pub low_24h: Option<f64>,
    pub last_updated: Option<String>,
    pub image: Option<String>,
}

impl WatchlistItem {
    pub fn apply_quote(&mut self, quote: &MarketQuote) {
        self.current_price = quote.current_price;
        self.price_change_24h = quote.price_change_percentage_24h;
        self.market_cap = quote.market_cap;
        self.market_cap_rank = quote.market_cap_rank;
        self.high_24h = quote.high_24h;
        self.low_24h = quote.low_24h;
        self.last_updated = quote.last_updated.clone();
        if self.image.is_none() {
            self.image = quote.image.clone();
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WatchlistCheckResponse {
    pub is_in_watchlist: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchCheckRequest {
    pub coin_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WatchlistCountResponse {
    pub count: usize,
}

// =============================================================================
// Users (admin)
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserStatusRequest {
    pub is_active: bool,
}

// =============================================================================
// Employee
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: u64,
    pub name: String,
    pub employee_id: String,
    pub department: String,
    pub email: String,
}

/// Fields to change on the employee record; absent fields are kept.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployeeRequest {
    pub name: Option<String>,
    pub employee_id: Option<String>,
    pub department: Option<String>,
    pub email: Option<String>,
}

// =============================================================================
// AI Chat
// =============================================================================

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub context: Option<ChatContext>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatReply {
    pub response: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatResponse {
    pub success: bool,
    pub data: ChatReply,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AiHealthResponse {
    /// `ok` or `unavailable`
    pub status: String,
}
