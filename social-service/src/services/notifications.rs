use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::{metrics, SocialStore};
use crate::dtos::notifications::NotificationResponse;
use crate::models::{Notification, User};

#[derive(Clone)]
pub struct NotificationService {
    store: Arc<dyn SocialStore>,
}

impl NotificationService {
    pub fn new(store: Arc<dyn SocialStore>) -> Self {
        Self { store }
    }

    /// Stores `notification` unless the actor is notifying themselves.
    pub async fn notify(&self, notification: Notification) -> Result<(), AppError> {
        if notification.from == notification.to {
            return Ok(());
        }

        self.store.insert_notification(&notification).await?;
        metrics::record_notification(notification.kind);
        tracing::debug!(
            kind = %notification.kind,
            to = %notification.to,
            "Notification created"
        );
        Ok(())
    }

    /// Inbox of `user`, newest first, with sender, post and comment previews.
    pub async fn list_for(&self, user: &User) -> Result<Vec<NotificationResponse>, AppError> {
        let notifications = self.store.list_notifications_for(&user.id).await?;

        let sender_ids = unique(notifications.iter().map(|n| n.from));
        let post_ids = unique(notifications.iter().filter_map(|n| n.post));
        let comment_ids = unique(notifications.iter().filter_map(|n| n.comment));

        let senders: HashMap<_, _> = self
            .store
            .find_users_by_ids(&sender_ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let posts: HashMap<_, _> = self
            .store
            .find_posts_by_ids(&post_ids)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();
        let comments: HashMap<_, _> = self
            .store
            .find_comments_by_ids(&comment_ids)
            .await?
            .into_iter()
            .map(|c| (c.id, c))
            .collect();

        Ok(notifications
            .iter()
            .map(|n| {
                NotificationResponse::new(
                    n,
                    senders.get(&n.from),
                    n.post.and_then(|id| posts.get(&id)),
                    n.comment.and_then(|id| comments.get(&id)),
                )
            })
            .collect())
    }

    pub async fn delete(&self, user: &User, notification_id: &str) -> Result<(), AppError> {
        let id = ObjectId::parse_str(notification_id)?;

        if !self.store.delete_notification(&id, &user.id).await? {
            return Err(AppError::not_found("Notification not found"));
        }

        tracing::info!(notification_id = %id, user_id = %user.id, "Notification deleted");
        Ok(())
    }

    pub async fn purge_post(&self, post_id: &ObjectId) -> Result<u64, AppError> {
        self.store.delete_notifications_for_post(post_id).await
    }

    pub async fn purge_comment(&self, comment_id: &ObjectId) -> Result<u64, AppError> {
        self.store.delete_notifications_for_comment(comment_id).await
    }
}

/// Distinct ids in first-seen order.
pub(crate) fn unique(ids: impl Iterator<Item = ObjectId>) -> Vec<ObjectId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}
