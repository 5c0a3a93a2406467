use async_trait::async_trait;
use chrono::Utc;
use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

use super::store::{SocialStore, DUPLICATE_USER};
use crate::models::{Comment, Notification, Post, ProfileUpdate, User};

/// Non-persistent store selected with `STORE_BACKEND=memory`. All tables sit
/// behind one lock, so every call is atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

#[derive(Default)]
struct Tables {
    users: HashMap<ObjectId, User>,
    posts: HashMap<ObjectId, Post>,
    comments: HashMap<ObjectId, Comment>,
    notifications: HashMap<ObjectId, Notification>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Returns whether `set` changed.
fn add_member(set: &mut Vec<ObjectId>, id: ObjectId, present: bool) -> bool {
    if present {
        if set.contains(&id) {
            return false;
        }
        set.push(id);
        true
    } else {
        let before = set.len();
        set.retain(|x| *x != id);
        set.len() != before
    }
}

/// Clones the values passing `keep`, newest first.
fn newest_first<'a, T, I, F>(items: I, keep: F) -> Vec<T>
where
    T: Clone + Timestamped + 'a,
    I: Iterator<Item = &'a T>,
    F: Fn(&T) -> bool,
{
    let mut out: Vec<T> = items.filter(|v| keep(v)).cloned().collect();
    out.sort_by(|a, b| b.sort_key().cmp(&a.sort_key()));
    out
}

trait Timestamped {
    fn sort_key(&self) -> (chrono::DateTime<Utc>, ObjectId);
}

impl Timestamped for Post {
    fn sort_key(&self) -> (chrono::DateTime<Utc>, ObjectId) {
        (self.created_at, self.id)
    }
}

impl Timestamped for Comment {
    fn sort_key(&self) -> (chrono::DateTime<Utc>, ObjectId) {
        (self.created_at, self.id)
    }
}

impl Timestamped for Notification {
    fn sort_key(&self) -> (chrono::DateTime<Utc>, ObjectId) {
        (self.created_at, self.id)
    }
}

#[async_trait]
impl SocialStore for InMemoryStore {
    async fn health_check(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let taken = tables.users.values().any(|u| {
            u.email == user.email
                || u.username == user.username
                || (user.clerk_id.is_some() && u.clerk_id == user.clerk_id)
        });
        if taken {
            return Err(AppError::bad_request(DUPLICATE_USER));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        Ok(self.tables.read().await.users.get(id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .find(|u| u.clerk_id.as_deref() == Some(clerk_id))
            .cloned())
    }

    async fn user_exists(&self, email: &str, username: &str) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .values()
            .any(|u| u.email == email || u.username == username))
    }

    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.users.get(id).cloned())
            .collect())
    }

    async fn update_user_profile(
        &self,
        id: &ObjectId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables.users.get_mut(id).map(|user| {
            user.apply(update);
            user.clone()
        }))
    }

    async fn set_following(
        &self,
        follower: &ObjectId,
        target: &ObjectId,
        follow: bool,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let mut changed = false;
        if let Some(user) = tables.users.get_mut(follower) {
            changed = add_member(&mut user.following, *target, follow);
            user.updated_at = Utc::now();
        }
        if let Some(user) = tables.users.get_mut(target) {
            add_member(&mut user.followers, *follower, follow);
            user.updated_at = Utc::now();
        }
        Ok(changed)
    }

    async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        self.tables.write().await.posts.insert(post.id, post.clone());
        Ok(())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, AppError> {
        Ok(self.tables.read().await.posts.get(id).cloned())
    }

    async fn find_posts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Post>, AppError> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.posts.get(id).cloned())
            .collect())
    }

    async fn list_posts(&self, owner: Option<&ObjectId>) -> Result<Vec<Post>, AppError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.posts.values(), |p| {
            owner.map_or(true, |o| p.user == *o)
        }))
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool, AppError> {
        Ok(self.tables.write().await.posts.remove(id).is_some())
    }

    async fn set_post_like(
        &self,
        post: &ObjectId,
        user: &ObjectId,
        liked: bool,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .posts
            .get_mut(post)
            .is_some_and(|p| add_member(&mut p.likes, *user, liked)))
    }

    async fn attach_comment(
        &self,
        post: &ObjectId,
        comment: &ObjectId,
        attached: bool,
    ) -> Result<(), AppError> {
        if let Some(p) = self.tables.write().await.posts.get_mut(post) {
            add_member(&mut p.comments, *comment, attached);
        }
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .comments
            .insert(comment.id, comment.clone());
        Ok(())
    }

    async fn find_comment(&self, id: &ObjectId) -> Result<Option<Comment>, AppError> {
        Ok(self.tables.read().await.comments.get(id).cloned())
    }

    async fn find_comments_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Comment>, AppError> {
        let wanted: HashSet<&ObjectId> = ids.iter().collect();
        let tables = self.tables.read().await;
        Ok(newest_first(tables.comments.values(), |c| wanted.contains(&c.id)))
    }

    async fn list_comments_for_post(&self, post: &ObjectId) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.comments.values(), |c| c.post == *post))
    }

    async fn delete_comment(&self, id: &ObjectId) -> Result<bool, AppError> {
        Ok(self.tables.write().await.comments.remove(id).is_some())
    }

    async fn delete_comments_for_post(&self, post: &ObjectId) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.comments.len();
        tables.comments.retain(|_, c| c.post != *post);
        Ok((before - tables.comments.len()) as u64)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.tables
            .write()
            .await
            .notifications
            .insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_notifications_for(&self, to: &ObjectId) -> Result<Vec<Notification>, AppError> {
        let tables = self.tables.read().await;
        Ok(newest_first(tables.notifications.values(), |n| n.to == *to))
    }

    async fn delete_notification(&self, id: &ObjectId, to: &ObjectId) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let addressed = tables.notifications.get(id).is_some_and(|n| n.to == *to);
        if addressed {
            tables.notifications.remove(id);
        }
        Ok(addressed)
    }

    async fn delete_notifications_for_post(&self, post: &ObjectId) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|_, n| n.post != Some(*post));
        Ok((before - tables.notifications.len()) as u64)
    }

    async fn delete_notifications_for_comment(
        &self,
        comment: &ObjectId,
    ) -> Result<u64, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.notifications.len();
        tables.notifications.retain(|_, n| n.comment != Some(*comment));
        Ok((before - tables.notifications.len()) as u64)
    }
}
