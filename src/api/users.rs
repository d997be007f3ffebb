// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! User administration endpoints (admin only).

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{ErrorResponse, UpdateUserStatusRequest, UserResponse},
    state::AppState,
    storage::UserRepository,
};

/// List every account.
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users ordered by id", body = [UserResponse]),
        (status = 401, description = "Unauthorized - invalid or missing token"),
        (status = 403, description = "Caller is not an admin"),
    )
)]
pub async fn list_users(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = UserRepository::new(&state.db).list_all()?;
    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

/// Deactivate or reactivate an account.
///
/// Tokens of a deactivated account stop working immediately.
#[utoipa::path(
    patch,
    path = "/api/users/{id}/status",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUserStatusRequest,
    tag = "Users",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = UserResponse),
        (status = 400, description = "Admins cannot deactivate themselves", body = ErrorResponse),
        (status = 403, description = "Caller is not an admin"),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_user_status(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdateUserStatusRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if id == admin.user_id && !request.is_active {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    let user = UserRepository::new(&state.db).set_active(id, request.is_active)?;
    tracing::info!(admin_id = admin.user_id, user_id = id, is_active = request.is_active, "Account status updated by admin");
    Ok(Json(user.into()))
}
