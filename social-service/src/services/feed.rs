use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::collections::HashMap;
use std::sync::Arc;

use super::notifications::unique;
use super::{metrics, ImageHost, NotificationService, SocialStore};
use crate::dtos::posts::{CommentResponse, CreatePostRequest, PostResponse};
use crate::dtos::users::UserSummary;
use crate::models::{Comment, Notification, Post, User};

/// Posts, likes and comments.
#[derive(Clone)]
pub struct FeedService {
    store: Arc<dyn SocialStore>,
    images: Arc<dyn ImageHost>,
    notifications: NotificationService,
}

impl FeedService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        images: Arc<dyn ImageHost>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            images,
            notifications,
        }
    }

    pub async fn list_posts(&self) -> Result<Vec<PostResponse>, AppError> {
        let posts = self.store.list_posts(None).await?;
        self.populate_posts(posts).await
    }

    pub async fn list_user_posts(&self, username: &str) -> Result<Vec<PostResponse>, AppError> {
        let owner = self
            .store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let posts = self.store.list_posts(Some(&owner.id)).await?;
        self.populate_posts(posts).await
    }

    pub async fn get_post(&self, post_id: &str) -> Result<PostResponse, AppError> {
        let post = self.load_post(post_id).await?;
        let mut populated = self.populate_posts(vec![post]).await?;
        populated
            .pop()
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    pub async fn create_post(
        &self,
        author: &User,
        req: CreatePostRequest,
    ) -> Result<PostResponse, AppError> {
        let (content, image) = req.parts();
        if content.is_none() && image.is_none() {
            return Err(AppError::bad_request(
                "Post must contain either text or image",
            ));
        }

        let hosted = match image {
            Some(source) => Some(self.images.upload(&source).await?),
            None => None,
        };

        let (image_url, public_id) = match hosted {
            Some(h) => (h.url, h.public_id),
            None => (String::new(), None),
        };

        let post = Post::new(author.id, content.unwrap_or_default(), image_url, public_id);
        self.store.insert_post(&post).await?;

        metrics::record_post_created();
        tracing::info!(post_id = %post.id, user_id = %author.id, "Post created");

        Ok(PostResponse::new(&post, Some(UserSummary::from(author)), Vec::new()))
    }

    /// Likes or unlikes a post; returns whether the caller now likes it.
    pub async fn toggle_like(&self, user: &User, post_id: &str) -> Result<bool, AppError> {
        let post = self.load_post(post_id).await?;

        let liked = !post.is_liked_by(&user.id);
        let changed = self.store.set_post_like(&post.id, &user.id, liked).await?;

        if liked && changed && post.user != user.id {
            self.notifications
                .notify(Notification::like(user.id, post.user, post.id))
                .await?;
        }

        metrics::record_like(liked);
        tracing::info!(post_id = %post.id, user_id = %user.id, liked, "Like toggled");
        Ok(liked)
    }

    /// Removes a post with its comments and the notifications that point at
    /// it. The hosted image is only released once the post is gone.
    pub async fn delete_post(&self, user: &User, post_id: &str) -> Result<(), AppError> {
        let post = self.load_post(post_id).await?;

        if post.user != user.id {
            return Err(AppError::forbidden("You can only delete your own posts"));
        }

        let comments = self.store.delete_comments_for_post(&post.id).await?;
        let notifications = self.notifications.purge_post(&post.id).await?;
        self.store.delete_post(&post.id).await?;

        if let Some(public_id) = &post.image_public_id {
            if let Err(e) = self.images.destroy(public_id).await {
                tracing::warn!(post_id = %post.id, public_id = %public_id, error = %e, "Failed to remove hosted image");
            }
        }

        tracing::info!(
            post_id = %post.id,
            comments,
            notifications,
            "Post deleted"
        );
        Ok(())
    }

    pub async fn list_comments(&self, post_id: &str) -> Result<Vec<CommentResponse>, AppError> {
        let post = self.load_post(post_id).await?;
        let comments = self.store.list_comments_for_post(&post.id).await?;
        self.populate_comments(&comments).await
    }

    pub async fn add_comment(
        &self,
        author: &User,
        post_id: &str,
        content: &str,
    ) -> Result<CommentResponse, AppError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(AppError::bad_request("Comment content is required"));
        }

        let post = self.load_post(post_id).await?;

        let comment = Comment::new(author.id, post.id, content.to_string());
        self.store.insert_comment(&comment).await?;
        self.store.attach_comment(&post.id, &comment.id, true).await?;

        if post.user != author.id {
            self.notifications
                .notify(Notification::comment(
                    author.id, post.user, post.id, comment.id,
                ))
                .await?;
        }

        metrics::record_comment();
        tracing::info!(comment_id = %comment.id, post_id = %post.id, "Comment added");

        Ok(CommentResponse::new(
            &comment,
            Some(UserSummary::from(author)),
        ))
    }

    pub async fn delete_comment(&self, user: &User, comment_id: &str) -> Result<(), AppError> {
        let id = ObjectId::parse_str(comment_id)?;
        let comment = self
            .store
            .find_comment(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Comment not found"))?;

        if comment.user != user.id {
            return Err(AppError::forbidden("You can only delete your own comments"));
        }

        self.store
            .attach_comment(&comment.post, &comment.id, false)
            .await?;
        self.store.delete_comment(&comment.id).await?;
        self.notifications.purge_comment(&comment.id).await?;

        tracing::info!(comment_id = %comment.id, "Comment deleted");
        Ok(())
    }

    async fn load_post(&self, post_id: &str) -> Result<Post, AppError> {
        let id = ObjectId::parse_str(post_id)?;
        self.store
            .find_post(&id)
            .await?
            .ok_or_else(|| AppError::not_found("Post not found"))
    }

    /// Embeds owners, and comments with their owners, in post order.
    async fn populate_posts(&self, posts: Vec<Post>) -> Result<Vec<PostResponse>, AppError> {
        let comment_ids = unique(posts.iter().flat_map(|p| p.comments.iter().copied()));
        let comments: HashMap<ObjectId, Comment> = self
            .store
            .find_comments_by_ids(&comment_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        let user_ids = unique(
            posts
                .iter()
                .map(|p| p.user)
                .chain(comments.values().map(|c| c.user)),
        );
        let users = self.user_summaries(&user_ids).await?;

        Ok(posts
            .iter()
            .map(|post| {
                let embedded = post
                    .comments
                    .iter()
                    .filter_map(|id| comments.get(id))
                    .map(|c| CommentResponse::new(c, users.get(&c.user).cloned()))
                    .collect();
                PostResponse::new(post, users.get(&post.user).cloned(), embedded)
            })
            .collect())
    }

    async fn populate_comments(
        &self,
        comments: &[Comment],
    ) -> Result<Vec<CommentResponse>, AppError> {
        let user_ids = unique(comments.iter().map(|c| c.user));
        let users = self.user_summaries(&user_ids).await?;

        Ok(comments
            .iter()
            .map(|c| CommentResponse::new(c, users.get(&c.user).cloned()))
            .collect())
    }

    async fn user_summaries(
        &self,
        ids: &[ObjectId],
    ) -> Result<HashMap<ObjectId, UserSummary>, AppError> {
        Ok(self
            .store
            .find_users_by_ids(ids)
            .await?
            .iter()
            .map(|u| (u.id, UserSummary::from(u)))
            .collect())
    }
}
