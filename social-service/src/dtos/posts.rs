use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::{hex_ids, users::UserSummary};
use crate::models::{Comment, Post};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[validate(length(max = 2000, message = "Post content must be at most 2000 characters"))]
    pub content: Option<String>,

    /// Data URI or remote URL handed to the image host.
    pub image: Option<String>,
}

impl CreatePostRequest {
    /// Trimmed content and image, `None` when blank.
    pub fn parts(&self) -> (Option<String>, Option<String>) {
        let clean = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        (clean(&self.content), clean(&self.image))
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(custom(function = "not_blank", message = "Comment content is required"))]
    #[validate(length(max = 1000, message = "Comment must be at most 1000 characters"))]
    pub content: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: String,
    pub post: String,
    pub content: String,
    /// `None` when the author has since been removed.
    pub user: Option<UserSummary>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CommentResponse {
    pub fn new(comment: &Comment, user: Option<UserSummary>) -> Self {
        Self {
            id: comment.id.to_hex(),
            post: comment.post.to_hex(),
            content: comment.content.clone(),
            user,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: String,
    pub user: Option<UserSummary>,
    pub content: String,
    pub image: String,
    pub likes: Vec<String>,
    pub comments: Vec<CommentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PostResponse {
    pub fn new(post: &Post, user: Option<UserSummary>, comments: Vec<CommentResponse>) -> Self {
        Self {
            id: post.id.to_hex(),
            user,
            content: post.content.clone(),
            image: post.image.clone(),
            likes: hex_ids(&post.likes),
            comments,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PostEnvelope {
    pub post: PostResponse,
}

#[derive(Debug, Serialize)]
pub struct PostListResponse {
    pub posts: Vec<PostResponse>,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub message: String,
    pub liked: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentEnvelope {
    pub comment: CommentResponse,
}

#[derive(Debug, Serialize)]
pub struct CommentListResponse {
    pub comments: Vec<CommentResponse>,
}
