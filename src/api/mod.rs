// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    body::Body,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method, Request,
    },
    routing::{get, patch, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{LoginType, Role},
    error::ApiError,
    models::{
        AddToWatchlistRequest, AiHealthResponse, AuthResponse, BatchCheckRequest, ChatReply,
        ChatRequest, ChatResponse, CreatePostRequest, Employee, ErrorResponse, LoginRequest,
        PostResponse, RegisterRequest, ReorderPostsRequest, UpdateEmployeeRequest,
        UpdatePostRequest, UpdateUserStatusRequest, UserResponse, WatchlistCheckResponse,
        WatchlistCountResponse, WatchlistItem,
    },
    providers::ChatContext,
    state::AppState,
};

pub mod ai;
pub mod auth;
pub mod employee;
pub mod health;
pub mod market;
pub mod posts;
pub mod users;
pub mod watchlist;

/// `*` allows any origin; anything else is an exact origin list.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let allow_origin = if origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|origin| match HeaderValue::from_str(origin) {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    let api_routes = Router::new()
        // Health
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/profile", get(auth::profile))
        .route("/auth/google", get(auth::google_login))
        .route("/auth/google/callback", get(auth::google_callback))
        .route("/auth/azure", get(auth::azure_login))
        .route("/auth/azure/callback", get(auth::azure_callback))
        // Market data proxy
        .route("/coins/markets", get(market::coins_markets))
        .route("/coins/{id}", get(market::coin_by_id))
        .route("/coins/{id}/market_chart", get(market::coin_market_chart))
        .route("/nfts/list", get(market::nfts_list))
        .route("/nfts/{id}", get(market::nft_by_id))
        .route("/news", get(market::news))
        .route("/crypto-details", get(market::crypto_details))
        .route("/crypto-details/chart/{id}", get(market::crypto_details_chart))
        .route("/crypto-market-list", get(market::crypto_market_list))
        .route("/exchanges", get(market::exchanges))
        .route("/exchanges/{id}", get(market::exchange_by_id))
        .route("/exchanges/{id}/tickers", get(market::exchange_tickers))
        // Posts
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route("/posts/reorder", put(posts::reorder_posts))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .patch(posts::update_post)
                .delete(posts::delete_post),
        )
        // Watchlist
        .route(
            "/watchlist",
            get(watchlist::list_watchlist).post(watchlist::add_to_watchlist),
        )
        .route("/watchlist/count", get(watchlist::watchlist_count))
        .route("/watchlist/check-batch", post(watchlist::check_watchlist_batch))
        .route("/watchlist/check/{coin_id}", get(watchlist::check_watchlist))
        .route(
            "/watchlist/{coin_id}",
            axum::routing::delete(watchlist::remove_from_watchlist),
        )
        // Employee
        .route(
            "/employee",
            get(employee::get_employee).put(employee::update_employee),
        )
        .route("/employees", get(employee::list_employees))
        // Users (admin)
        .route("/users", get(users::list_users))
        .route("/users/{id}/status", patch(users::update_user_status))
        // AI
        .route("/ai/chat", post(ai::chat))
        .route("/ai/health", get(ai::ai_health))
        .with_state(state);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    Router::new()
        .nest("/api", api_routes)
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .fallback(not_found)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(trace)
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(cors_layer(cors_origins)),
        )
}

/// Registers the bearer JWT scheme referenced by guarded operations.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    modifiers(&SecurityAddon),
    info(
        title = "Crypto Place API",
        description = "Market data proxy, accounts, posts and watchlists."
    ),
    paths(
        health::health,
        health::liveness,
        auth::register,
        auth::login,
        auth::profile,
        auth::google_login,
        auth::google_callback,
        auth::azure_login,
        auth::azure_callback,
        market::coins_markets,
        market::coin_by_id,
        market::coin_market_chart,
        market::nfts_list,
        market::nft_by_id,
        market::news,
        market::crypto_details,
        market::crypto_details_chart,
        market::crypto_market_list,
        market::exchanges,
        market::exchange_by_id,
        market::exchange_tickers,
        posts::create_post,
        posts::list_posts,
        posts::get_post,
        posts::update_post,
        posts::delete_post,
        posts::reorder_posts,
        watchlist::add_to_watchlist,
        watchlist::remove_from_watchlist,
        watchlist::list_watchlist,
        watchlist::check_watchlist,
        watchlist::check_watchlist_batch,
        watchlist::watchlist_count,
        employee::get_employee,
        employee::list_employees,
        employee::update_employee,
        users::list_users,
        users::update_user_status,
        ai::chat,
        ai::ai_health
    ),
    components(
        schemas(
            ErrorResponse,
            Role,
            LoginType,
            RegisterRequest,
            LoginRequest,
            UserResponse,
            AuthResponse,
            CreatePostRequest,
            UpdatePostRequest,
            ReorderPostsRequest,
            PostResponse,
            AddToWatchlistRequest,
            WatchlistItem,
            WatchlistCheckResponse,
            BatchCheckRequest,
            WatchlistCountResponse,
            UpdateUserStatusRequest,
            Employee,
            UpdateEmployeeRequest,
            ChatContext,
            ChatRequest,
            ChatReply,
            ChatResponse,
            AiHealthResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness probes"),
        (name = "Auth", description = "Registration, login and external identity providers"),
        (name = "Market", description = "CoinGecko and CryptoCompare proxy"),
        (name = "Posts", description = "User posts with manual ordering"),
        (name = "Watchlist", description = "Per-user coin watchlist"),
        (name = "Employee", description = "Employee record"),
        (name = "Users", description = "Account administration"),
        (name = "AI", description = "AI assistant")
    )
)]
pub struct ApiDoc;
