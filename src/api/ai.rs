// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};
use chrono::Utc;

use crate::{
    auth::Auth,
    error::ApiError,
    models::{AiHealthResponse, ChatReply, ChatRequest, ChatResponse, ErrorResponse},
    state::AppState,
};

/// Forward a chat message to the AI assistant.
#[utoipa::path(
    post,
    path = "/api/ai/chat",
    request_body = ChatRequest,
    tag = "AI",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = ChatResponse),
        (status = 400, description = "Empty message", body = ErrorResponse),
        (status = 500, description = "AI service failed", body = ErrorResponse)
    )
)]
pub async fn chat(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let message = request.message.trim();
    if message.is_empty() {
        return Err(ApiError::bad_request("Message is required"));
    }

    let context = request.context.unwrap_or_default();
    let response = state.chat.send(message, user.user_id, &context).await?;
    Ok(Json(ChatResponse {
        success: true,
        data: ChatReply {
            response,
            timestamp: Utc::now(),
        },
    }))
}

#[utoipa::path(
    get,
    path = "/api/ai/health",
    tag = "AI",
    responses((status = 200, body = AiHealthResponse))
)]
pub async fn ai_health(State(state): State<AppState>) -> Json<AiHealthResponse> {
    let status = if state.chat.is_healthy().await {
        "ok"
    } else {
        "unavailable"
    };
    Json(AiHealthResponse {
        status: status.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthenticatedUser, LoginType, Role};
    use crate::config::Config;
    use crate::state::test_support::{test_state, test_state_with};
    use axum::http::StatusCode;

    fn caller() -> Auth {
        Auth(AuthenticatedUser {
            user_id: 7,
            email: "alice@example.com".into(),
            role: Role::User,
            login_type: LoginType::Password,
            expires_at: Utc::now().timestamp() + 3600,
        })
    }

    fn chat_state(url: &str) -> (AppState, tempfile::TempDir) {
        test_state_with(Config {
            chainlit_service_url: url.to_string(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn empty_message_is_rejected() {
        let (state, _dir) = test_state();
        let err = chat(
            caller(),
            State(state),
            Json(ChatRequest {
                message: "   ".into(),
                context: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn reply_is_wrapped() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"userId": "7"})))
            .with_status(200)
            .with_body(r#"{"response":"Bitcoin is up today."}"#)
            .create_async()
            .await;

        let (state, _dir) = chat_state(&server.url());
        let Json(reply) = chat(
            caller(),
            State(state),
            Json(ChatRequest {
                message: "How is BTC?".into(),
                context: None,
            }),
        )
        .await
        .unwrap();
        assert!(reply.success);
        assert_eq!(reply.data.response, "Bitcoin is up today.");
    }

    #[tokio::test]
    async fn service_failure_is_500_with_details() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(502)
            .with_body("model offline")
            .create_async()
            .await;

        let (state, _dir) = chat_state(&server.url());
        let err = chat(
            caller(),
            State(state),
            Json(ChatRequest {
                message: "hi".into(),
                context: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.details.unwrap().contains("model offline"));
    }

    #[tokio::test]
    async fn health_reflects_service() {
        let mut server = mockito::Server::new_async().await;
        server.mock("GET", "/health").with_status(200).create_async().await;
        let (state, _dir) = chat_state(&server.url());
        let Json(health) = ai_health(State(state)).await;
        assert_eq!(health.status, "ok");

        let (state, _dir) = chat_state("http://127.0.0.1:9");
        let Json(health) = ai_health(State(state)).await;
        assert_eq!(health.status, "unavailable");
    }
}
