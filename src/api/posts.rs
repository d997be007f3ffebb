// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    auth::{Auth, AuthenticatedUser},
    error::ApiError,
    models::{
        CreatePostRequest, ErrorResponse, ListPostsQuery, PostResponse, ReorderPostsRequest,
        UpdatePostRequest,
    },
    state::AppState,
    storage::{PostChanges, PostRepository},
};

fn ensure_can_modify(user: &AuthenticatedUser, author_id: u64) -> Result<(), ApiError> {
    if user.can_modify(author_id) {
        Ok(())
    } else {
        Err(ApiError::forbidden("Only the author or an admin can change this post"))
    }
}

fn non_empty_title(title: &str) -> Result<String, ApiError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ApiError::bad_request("Title is required"));
    }
    Ok(title.to_string())
}

#[utoipa::path(
    post,
    path = "/api/posts",
    request_body = CreatePostRequest,
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 201, body = PostResponse),
        (status = 400, description = "Empty title", body = ErrorResponse)
    )
)]
pub async fn create_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<CreatePostRequest>,
) -> Result<(StatusCode, Json<PostResponse>), ApiError> {
    let title = non_empty_title(&request.title)?;
    let post = PostRepository::new(&state.db).create(user.user_id, title, request.content)?;
    Ok((StatusCode::CREATED, Json(post.into())))
}

#[utoipa::path(
    get,
    path = "/api/posts",
    params(ListPostsQuery),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses((status = 200, body = [PostResponse]))
)]
pub async fn list_posts(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = PostRepository::new(&state.db).list(query.author_id)?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/posts/{id}",
    params(("id" = u64, Path, description = "Post id")),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PostResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn get_post(
    Auth(_user): Auth,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<PostResponse>, ApiError> {
    Ok(Json(PostRepository::new(&state.db).get(id)?.into()))
}

#[utoipa::path(
    patch,
    path = "/api/posts/{id}",
    params(("id" = u64, Path, description = "Post id")),
    request_body = UpdatePostRequest,
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, body = PostResponse),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn update_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<UpdatePostRequest>,
) -> Result<Json<PostResponse>, ApiError> {
    let posts = PostRepository::new(&state.db);
    ensure_can_modify(&user, posts.get(id)?.author_id)?;

    let changes = PostChanges {
        title: request.title.as_deref().map(non_empty_title).transpose()?,
        content: request.content,
    };
    Ok(Json(posts.update(id, changes)?.into()))
}

#[utoipa::path(
    delete,
    path = "/api/posts/{id}",
    params(("id" = u64, Path, description = "Post id")),
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 204),
        (status = 403, description = "Not the author", body = ErrorResponse),
        (status = 404, body = ErrorResponse)
    )
)]
pub async fn delete_post(
    Auth(user): Auth,
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<StatusCode, ApiError> {
    let posts = PostRepository::new(&state.db);
    ensure_can_modify(&user, posts.get(id)?.author_id)?;
    posts.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Move one of the caller's posts and renumber them all.
#[utoipa::path(
    put,
    path = "/api/posts/reorder",
    request_body = ReorderPostsRequest,
    tag = "Posts",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's posts in their new order", body = [PostResponse]),
        (status = 400, description = "Index out of range", body = ErrorResponse)
    )
)]
pub async fn reorder_posts(
    Auth(user): Auth,
    State(state): State<AppState>,
    Json(request): Json<ReorderPostsRequest>,
) -> Result<Json<Vec<PostResponse>>, ApiError> {
    let posts = PostRepository::new(&state.db).reorder(
        user.user_id,
        request.source_index,
        request.target_index,
    )?;
    Ok(Json(posts.into_iter().map(PostResponse::from).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{LoginType, Role};
    use crate::state::test_support::{create_user, test_state};
    use crate::storage::StoredUser;

    fn caller(user: &StoredUser) -> Auth {
        Auth(AuthenticatedUser {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            login_type: LoginType::Password,
            expires_at: chrono::Utc::now().timestamp() + 3600,
        })
    }

    async fn post(state: &AppState, user: &StoredUser, title: &str) -> PostResponse {
        let (_, Json(post)) = create_post(
            caller(user),
            State(state.clone()),
            Json(CreatePostRequest {
                title: title.into(),
                content: None,
            }),
        )
        .await
        .unwrap();
        post
    }

    #[tokio::test]
    async fn reorder_moves_first_to_last() {
        let (state, _dir) = test_state();
        let alice = create_user(&state, "alice@example.com", Role::User);
        for title in ["a", "b", "c"] {
            post(&state, &alice, title).await;
        }

        let Json(reordered) = reorder_posts(
            caller(&alice),
            State(state.clone()),
            Json(ReorderPostsRequest {
                source_index: 0,
                target_index: 2,
            }),
        )
        .await
        .unwrap();

        let titles: Vec<_> = reordered.iter().map(|p| p.title.as_str()).collect();
        let orders: Vec<_> = reordered.iter().map(|p| p.order).collect();
        assert_eq!(titles, ["b", "c", "a"]);
        assert_eq!(orders, [1, 2, 3]);

        let Json(listed) = list_posts(
            caller(&alice),
            State(state),
            Query(ListPostsQuery {
                author_id: Some(alice.id),
            }),
        )
        .await
        .unwrap();
        assert_eq!(listed, reordered);
    }

    #[tokio::test]
    async fn reorder_out_of_range_is_bad_request() {
        let (state, _dir) = test_state();
        let alice = create_user(&state, "alice@example.com", Role::User);
        post(&state, &alice, "only").await;

        let err = reorder_posts(
            caller(&alice),
            State(state),
            Json(ReorderPostsRequest {
                source_index: 0,
                target_index: 5,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn only_author_or_admin_may_modify() {
        let (state, _dir) = test_state();
        let alice = create_user(&state, "alice@example.com", Role::User);
        let mallory = create_user(&state, "mallory@example.com", Role::User);
        let admin = create_user(&state, "admin@example.com", Role::Admin);
        let created = post(&state, &alice, "mine").await;

        let err = update_post(
            caller(&mallory),
            State(state.clone()),
            Path(created.id),
            Json(UpdatePostRequest {
                title: Some("hijacked".into()),
                content: None,
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let err = delete_post(caller(&mallory), State(state.clone()), Path(created.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);

        let Json(updated) = update_post(
            caller(&admin),
            State(state.clone()),
            Path(created.id),
            Json(UpdatePostRequest {
                title: None,
                content: Some("moderated".into()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(updated.title, "mine");
        assert_eq!(updated.content.as_deref(), Some("moderated"));

        let status = delete_post(caller(&alice), State(state.clone()), Path(created.id))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::NO_CONTENT);

        let err = get_post(caller(&alice), State(state), Path(created.id))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blank_title_is_rejected() {
        let (state, _dir) = test_state();
        let alice = create_user(&state, "alice@example.com", Role::User);
        let err = create_post(
            caller(&alice),
            State(state),
            Json(CreatePostRequest {
                title: "   ".into(),
                content: Some("body".into()),
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }
}
