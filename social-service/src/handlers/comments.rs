//! `/api/comments`

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        posts::{CommentEnvelope, CommentListResponse, CreateCommentRequest},
        MessageResponse,
    },
    middleware::CurrentUser,
    utils::ValidatedJson,
    AppState,
};

/// `GET /post/:postId`
pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let comments = state.feed.list_comments(&post_id).await?;
    Ok(Json(CommentListResponse { comments }))
}

/// `POST /post/:postId`. Notifies the post owner unless they wrote it.
pub async fn create_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post_id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let comment = state
        .feed
        .add_comment(&user, &post_id, &req.content)
        .await?;
    Ok((StatusCode::CREATED, Json(CommentEnvelope { comment })))
}

/// `DELETE /:commentId`. Author only.
pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(comment_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.feed.delete_comment(&user, &comment_id).await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}
