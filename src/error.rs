// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::auth::oauth::OAuthError;
use crate::auth::{AuthError, PasswordError};
use crate::providers::{ChatError, UpstreamError};
use crate::storage::StoreError;

const INTERNAL_MESSAGE: &str = "Internal server error";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Log `source` and return a generic 500.
    pub fn internal(source: impl std::fmt::Display) -> Self {
        tracing::error!(error = %source, "Request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, INTERNAL_MESSAGE)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message,
            details: self.details,
        });
        (self.status, body).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(what) => Self::not_found(format!("{what} not found")),
            StoreError::Conflict(what) => Self::conflict(format!("{what} already exists")),
            StoreError::InvalidInput(reason) => Self::bad_request(reason),
            other => Self::internal(other),
        }
    }
}

impl From<UpstreamError> for ApiError {
    /// Upstream failures keep the vendor's status; transport and decode
    /// failures become 500. `error` is never empty.
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::Status { path, status, body } => {
                Self::new(status, format!("Upstream request failed: {path}")).with_details(body)
            }
            UpstreamError::Transport { path, source } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upstream request failed: {path}"),
            )
            .with_details(source.to_string()),
            UpstreamError::Decode { path, reason } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Upstream request failed: {path}"),
            )
            .with_details(reason),
            other @ UpstreamError::Client { .. } => Self::internal(other),
        }
    }
}

impl From<ChatError> for ApiError {
    fn from(err: ChatError) -> Self {
        tracing::error!(error = %err, "AI service request failed");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to process AI request",
        )
        .with_details(err.to_string())
    }
}

impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        Self::internal(err)
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InternalError(detail) => Self::internal(detail),
            other => Self::new(other.status_code(), other.to_string()),
        }
    }
}

impl From<OAuthError> for ApiError {
    /// A provider that refuses the code or returns an unusable identity is a
    /// failed login (401); anything else is ours (500).
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Rejected { .. }
            | OAuthError::InvalidResponse(_)
            | OAuthError::MissingClaim(_) => {
                tracing::warn!(error = %err, "External login rejected");
                Self::new(StatusCode::UNAUTHORIZED, "External login failed")
                    .with_details(err.to_string())
            }
            OAuthError::Transport(_) | OAuthError::Client(_) => Self::internal(err),
        }
    }
}
