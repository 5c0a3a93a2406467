//! `/api/posts` handlers. Reads are public; writes need a resolved user.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        posts::{CreatePostRequest, LikeResponse, PostEnvelope, PostListResponse},
        MessageResponse,
    },
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

/// All posts, newest first.
pub async fn list_posts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let posts = state.feed.list_posts().await?;
    Ok(Json(PostListResponse { posts }))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.feed.get_post(&post_id).await?;
    Ok(Json(PostEnvelope { post }))
}

/// Posts by one author, newest first.
pub async fn list_user_posts(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let posts = state.feed.list_user_posts(&username).await?;
    Ok(Json(PostListResponse { posts }))
}

/// Text, image or both. The image goes through the configured host.
pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    ValidatedJson(req): ValidatedJson<CreatePostRequest>,
) -> Result<impl IntoResponse, AppError> {
    let post = state.feed.create_post(&user, req).await?;
    Ok((StatusCode::CREATED, Json(PostEnvelope { post })))
}

/// Toggles the caller's like.
pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let liked = state.feed.toggle_like(&user, &post_id).await?;

    let message = if liked {
        "Post liked successfully"
    } else {
        "Post unliked successfully"
    };

    Ok(Json(LikeResponse {
        message: message.to_string(),
        liked,
    }))
}

/// Owner only.
pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.feed.delete_post(&user, &post_id).await?;
    Ok(Json(MessageResponse::new("Post deleted successfully")))
}
