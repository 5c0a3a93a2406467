//! `/api/notifications`, scoped to the caller.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{notifications::NotificationListResponse, MessageResponse},
    middleware::CurrentUser,
    AppState,
};

/// Newest first, with sender, post and comment populated.
pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl IntoResponse, AppError> {
    let notifications = state.notifications.list_for(&user).await?;
    Ok(Json(NotificationListResponse { notifications }))
}

/// 404 unless the notification is addressed to the caller.
pub async fn delete_notification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(notification_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.notifications.delete(&user, &notification_id).await?;
    Ok(Json(MessageResponse::new(
        "Notification deleted successfully",
    )))
}
