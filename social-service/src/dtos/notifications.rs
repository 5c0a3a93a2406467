use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Comment, Notification, NotificationKind, Post, User};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotifierSummary {
    pub id: String,
    pub user_name: String,
    pub profile_pic: String,
}

impl From<&User> for NotifierSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            user_name: user.username.clone(),
            profile_pic: user.profile_pic.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostPreview {
    pub id: String,
    pub content: String,
    pub image: String,
}

impl From<&Post> for PostPreview {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id.to_hex(),
            content: post.content.clone(),
            image: post.image.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommentPreview {
    pub id: String,
    pub content: String,
}

impl From<&Comment> for CommentPreview {
    fn from(comment: &Comment) -> Self {
        Self {
            id: comment.id.to_hex(),
            content: comment.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationResponse {
    pub id: String,
    pub from: Option<NotifierSummary>,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub post: Option<PostPreview>,
    pub comment: Option<CommentPreview>,
    pub created_at: DateTime<Utc>,
}

impl NotificationResponse {
    pub fn new(
        notification: &Notification,
        from: Option<&User>,
        post: Option<&Post>,
        comment: Option<&Comment>,
    ) -> Self {
        Self {
            id: notification.id.to_hex(),
            from: from.map(NotifierSummary::from),
            to: notification.to.to_hex(),
            kind: notification.kind,
            post: post.map(PostPreview::from),
            comment: comment.map(CommentPreview::from),
            created_at: notification.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct NotificationListResponse {
    pub notifications: Vec<NotificationResponse>,
}
