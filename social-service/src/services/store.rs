use async_trait::async_trait;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;

use crate::models::{Comment, Notification, Post, ProfileUpdate, User};

pub const DUPLICATE_USER: &str = "User already exist";

/// Persistence boundary of the service. Membership updates (`likes`,
/// `followers`, `following`, `comments`) have set semantics: adding an id
/// that is present or removing one that is absent is a no-op.
///
/// List queries return newest first.
#[async_trait]
pub trait SocialStore: Send + Sync {
    async fn health_check(&self) -> Result<(), AppError>;

    // users

    /// Fails with 400 "User already exist" when the email, username or Clerk
    /// id is taken.
    async fn insert_user(&self, user: &User) -> Result<(), AppError>;
    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError>;
    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError>;
    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError>;
    async fn user_exists(&self, email: &str, username: &str) -> Result<bool, AppError>;
    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<User>, AppError>;
    async fn update_user_profile(
        &self,
        id: &ObjectId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError>;
    /// Adds or removes both edges: `follower.following` and `target.followers`.
    /// Returns whether `follower.following` changed.
    async fn set_following(
        &self,
        follower: &ObjectId,
        target: &ObjectId,
        follow: bool,
    ) -> Result<bool, AppError>;

    // posts

    async fn insert_post(&self, post: &Post) -> Result<(), AppError>;
    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, AppError>;
    async fn find_posts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Post>, AppError>;
    /// Every post, or only those owned by `owner`.
    async fn list_posts(&self, owner: Option<&ObjectId>) -> Result<Vec<Post>, AppError>;
    async fn delete_post(&self, id: &ObjectId) -> Result<bool, AppError>;
    /// Returns whether `likes` changed.
    async fn set_post_like(
        &self,
        post: &ObjectId,
        user: &ObjectId,
        liked: bool,
    ) -> Result<bool, AppError>;
    async fn attach_comment(
        &self,
        post: &ObjectId,
        comment: &ObjectId,
        attached: bool,
    ) -> Result<(), AppError>;

    // comments

    async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError>;
    async fn find_comment(&self, id: &ObjectId) -> Result<Option<Comment>, AppError>;
    async fn find_comments_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Comment>, AppError>;
    async fn list_comments_for_post(&self, post: &ObjectId) -> Result<Vec<Comment>, AppError>;
    async fn delete_comment(&self, id: &ObjectId) -> Result<bool, AppError>;
    async fn delete_comments_for_post(&self, post: &ObjectId) -> Result<u64, AppError>;

    // notifications

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError>;
    async fn list_notifications_for(&self, to: &ObjectId) -> Result<Vec<Notification>, AppError>;
    /// Deletes only when the notification is addressed to `to`.
    async fn delete_notification(&self, id: &ObjectId, to: &ObjectId) -> Result<bool, AppError>;
    async fn delete_notifications_for_post(&self, post: &ObjectId) -> Result<u64, AppError>;
    async fn delete_notifications_for_comment(&self, comment: &ObjectId)
        -> Result<u64, AppError>;
}
