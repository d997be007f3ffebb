// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client for the Chainlit AI assistant service.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const CHAT_TIMEOUT: Duration = Duration::from_secs(30);
const HEALTH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("failed to build chat client: {0}")]
    Client(String),

    #[error("AI service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("AI service returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Optional market context sent along with a chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    /// Coin the user is currently looking at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coin_id: Option<String>,
    /// Quote currency of the current view
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vs_currency: Option<String>,
    /// Coin ids on the user's watchlist
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watchlist: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChatServiceRequest<'a> {
    message: &'a str,
    user_id: String,
    context: &'a ChatContext,
}

#[derive(Debug, Deserialize)]
struct ChatServiceResponse {
    response: String,
}

pub struct ChatClient {
    base_url: String,
    http: Client,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Result<Self, ChatError> {
        let http = Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Send one message and return the assistant's reply text.
    pub async fn send(
        &self,
        message: &str,
        user_id: u64,
        context: &ChatContext,
    ) -> Result<String, ChatError> {
        let response = self
            .http
            .post(format!("{}/api/chat", self.base_url))
            .json(&ChatServiceRequest {
                message,
                user_id: user_id.to_string(),
                context,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status { status, body });
        }
        let reply: ChatServiceResponse = response.json().await?;
        Ok(reply.response)
    }

    /// `true` when `GET /health` answers 200 within five seconds.
    pub async fn is_healthy(&self) -> bool {
        match self
            .http
            .get(format!("{}/health", self.base_url))
            .timeout(HEALTH_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => response.status() == reqwest::StatusCode::OK,
            Err(e) => {
                tracing::warn!(error = %e, "AI service health check failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    #[tokio::test]
    async fn send_posts_message_with_context() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "message": "price of btc?",
                "userId": "5",
                "context": {"coinId": "bitcoin"}
            })))
            .with_status(200)
            .with_body(r#"{"response":"about 60k"}"#)
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let context = ChatContext {
            coin_id: Some("bitcoin".into()),
            ..ChatContext::default()
        };
        let reply = client.send("price of btc?", 5, &context).await.unwrap();
        assert_eq!(reply, "about 60k");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn upstream_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(502)
            .with_body("bad gateway")
            .create_async()
            .await;

        let client = ChatClient::new(&server.url()).unwrap();
        let err = client
            .send("hi", 1, &ChatContext::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Status { status: 502, .. }));
    }

    #[tokio::test]
    async fn health_reflects_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/health")
            .with_status(200)
            .create_async()
            .await;
        assert!(ChatClient::new(&server.url()).unwrap().is_healthy().await);

        let down = ChatClient::new("http://127.0.0.1:9").unwrap();
        assert!(!down.is_healthy().await);
    }
}
