use async_trait::async_trait;
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, oid::ObjectId, Document},
    error::{ErrorKind, WriteFailure},
    options::{FindOneAndUpdateOptions, FindOptions, IndexOptions, ReturnDocument},
    Client as MongoClient, Collection, Database, IndexModel,
};
use service_core::error::AppError;

use super::store::{SocialStore, DUPLICATE_USER};
use crate::models::{Comment, Notification, Post, ProfileUpdate, User};

const DUPLICATE_KEY_CODE: i32 = 11000;

#[derive(Clone)]
pub struct MongoDb {
    client: MongoClient,
    db: Database,
}

impl MongoDb {
    pub async fn connect(uri: &str, database: &str) -> Result<Self, AppError> {
        tracing::info!("Connecting to MongoDB");
        let client = MongoClient::with_uri_str(uri).await.map_err(|e| {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            AppError::from(e)
        })?;
        let db = client.database(database);
        tracing::info!(database = %database, "Successfully connected to MongoDB database");
        Ok(Self { client, db })
    }

    pub async fn initialize_indexes(&self) -> Result<(), AppError> {
        tracing::info!("Creating MongoDB indexes for social-service");

        let unique = |name: &str| {
            IndexOptions::builder()
                .name(name.to_string())
                .unique(true)
                .build()
        };

        self.create_index(
            &self.users(),
            doc! { "email": 1 },
            unique("email_unique"),
            "users.email",
        )
        .await?;

        self.create_index(
            &self.users(),
            doc! { "username": 1 },
            unique("username_unique"),
            "users.username",
        )
        .await?;

        // Local accounts have no clerk_id; sparse keeps them out of the index.
        self.create_index(
            &self.users(),
            doc! { "clerk_id": 1 },
            IndexOptions::builder()
                .name("clerk_id_unique".to_string())
                .unique(true)
                .sparse(true)
                .build(),
            "users.clerk_id",
        )
        .await?;

        self.create_index(
            &self.posts(),
            doc! { "user": 1, "created_at": -1 },
            IndexOptions::builder()
                .name("owner_timeline".to_string())
                .build(),
            "posts.(user, created_at)",
        )
        .await?;

        self.create_index(
            &self.comments(),
            doc! { "post": 1, "created_at": -1 },
            IndexOptions::builder()
                .name("post_comments".to_string())
                .build(),
            "comments.(post, created_at)",
        )
        .await?;

        self.create_index(
            &self.notifications(),
            doc! { "to": 1, "created_at": -1 },
            IndexOptions::builder()
                .name("recipient_inbox".to_string())
                .build(),
            "notifications.(to, created_at)",
        )
        .await?;

        Ok(())
    }

    async fn create_index<T>(
        &self,
        collection: &Collection<T>,
        keys: Document,
        options: IndexOptions,
        label: &str,
    ) -> Result<(), AppError>
    where
        T: Send + Sync,
    {
        let model = IndexModel::builder().keys(keys).options(options).build();
        collection.create_index(model, None).await.map_err(|e| {
            tracing::error!("Failed to create index on {}: {}", label, e);
            AppError::from(e)
        })?;
        tracing::info!("Created index on {}", label);
        Ok(())
    }

    pub fn users(&self) -> Collection<User> {
        self.db.collection("users")
    }

    pub fn posts(&self) -> Collection<Post> {
        self.db.collection("posts")
    }

    pub fn comments(&self) -> Collection<Comment> {
        self.db.collection("comments")
    }

    pub fn notifications(&self) -> Collection<Notification> {
        self.db.collection("notifications")
    }

}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        *err.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref we)) if we.code == DUPLICATE_KEY_CODE
    )
}

/// `$addToSet` or `$pull` of a single id on an array field.
fn membership_update(add: bool, field: &str, value: ObjectId) -> Document {
    let mut member = Document::new();
    member.insert(field, value);

    let mut update = Document::new();
    update.insert(if add { "$addToSet" } else { "$pull" }, member);
    update
}

fn newest_first() -> FindOptions {
    FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .build()
}

async fn find_many<T>(
    collection: &Collection<T>,
    filter: Document,
    options: Option<FindOptions>,
) -> Result<Vec<T>, AppError>
where
    T: serde::de::DeserializeOwned + Unpin + Send + Sync,
{
    let cursor = collection.find(filter, options).await?;
    Ok(cursor.try_collect().await?)
}

#[async_trait]
impl SocialStore for MongoDb {
    async fn health_check(&self) -> Result<(), AppError> {
        self.client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                tracing::error!("MongoDB health check failed: {}", e);
                AppError::from(e)
            })?;
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        match self.users().insert_one(user, None).await {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_key(&e) => Err(AppError::bad_request(DUPLICATE_USER)),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_user_by_id(&self, id: &ObjectId) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(doc! { "username": username }, None)
            .await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        Ok(self.users().find_one(doc! { "email": email }, None).await?)
    }

    async fn find_user_by_clerk_id(&self, clerk_id: &str) -> Result<Option<User>, AppError> {
        Ok(self
            .users()
            .find_one(doc! { "clerk_id": clerk_id }, None)
            .await?)
    }

    async fn user_exists(&self, email: &str, username: &str) -> Result<bool, AppError> {
        let filter = doc! { "$or": [ { "email": email }, { "username": username } ] };
        Ok(self.users().count_documents(filter, None).await? > 0)
    }

    async fn find_users_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<User>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        find_many(&self.users(), doc! { "_id": { "$in": ids.to_vec() } }, None).await
    }

    async fn update_user_profile(
        &self,
        id: &ObjectId,
        update: &ProfileUpdate,
    ) -> Result<Option<User>, AppError> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        Ok(self
            .users()
            .find_one_and_update(
                doc! { "_id": *id },
                doc! { "$set": update.to_set_document() },
                options,
            )
            .await?)
    }

    async fn set_following(
        &self,
        follower: &ObjectId,
        target: &ObjectId,
        follow: bool,
    ) -> Result<bool, AppError> {
        let result = self
            .users()
            .update_one(
                doc! { "_id": *follower },
                membership_update(follow, "following", *target),
                None,
            )
            .await?;
        self.users()
            .update_one(
                doc! { "_id": *target },
                membership_update(follow, "followers", *follower),
                None,
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn insert_post(&self, post: &Post) -> Result<(), AppError> {
        self.posts().insert_one(post, None).await?;
        Ok(())
    }

    async fn find_post(&self, id: &ObjectId) -> Result<Option<Post>, AppError> {
        Ok(self.posts().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_posts_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Post>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        find_many(&self.posts(), doc! { "_id": { "$in": ids.to_vec() } }, None).await
    }

    async fn list_posts(&self, owner: Option<&ObjectId>) -> Result<Vec<Post>, AppError> {
        let filter = match owner {
            Some(owner) => doc! { "user": *owner },
            None => doc! {},
        };
        find_many(&self.posts(), filter, Some(newest_first())).await
    }

    async fn delete_post(&self, id: &ObjectId) -> Result<bool, AppError> {
        let result = self.posts().delete_one(doc! { "_id": *id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn set_post_like(
        &self,
        post: &ObjectId,
        user: &ObjectId,
        liked: bool,
    ) -> Result<bool, AppError> {
        let result = self
            .posts()
            .update_one(
                doc! { "_id": *post },
                membership_update(liked, "likes", *user),
                None,
            )
            .await?;
        Ok(result.modified_count > 0)
    }

    async fn attach_comment(
        &self,
        post: &ObjectId,
        comment: &ObjectId,
        attached: bool,
    ) -> Result<(), AppError> {
        self.posts()
            .update_one(
                doc! { "_id": *post },
                membership_update(attached, "comments", *comment),
                None,
            )
            .await?;
        Ok(())
    }

    async fn insert_comment(&self, comment: &Comment) -> Result<(), AppError> {
        self.comments().insert_one(comment, None).await?;
        Ok(())
    }

    async fn find_comment(&self, id: &ObjectId) -> Result<Option<Comment>, AppError> {
        Ok(self.comments().find_one(doc! { "_id": *id }, None).await?)
    }

    async fn find_comments_by_ids(&self, ids: &[ObjectId]) -> Result<Vec<Comment>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        find_many(
            &self.comments(),
            doc! { "_id": { "$in": ids.to_vec() } },
            Some(newest_first()),
        )
        .await
    }

    async fn list_comments_for_post(&self, post: &ObjectId) -> Result<Vec<Comment>, AppError> {
        find_many(&self.comments(), doc! { "post": *post }, Some(newest_first())).await
    }

    async fn delete_comment(&self, id: &ObjectId) -> Result<bool, AppError> {
        let result = self.comments().delete_one(doc! { "_id": *id }, None).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_comments_for_post(&self, post: &ObjectId) -> Result<u64, AppError> {
        let result = self
            .comments()
            .delete_many(doc! { "post": *post }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn insert_notification(&self, notification: &Notification) -> Result<(), AppError> {
        self.notifications().insert_one(notification, None).await?;
        Ok(())
    }

    async fn list_notifications_for(&self, to: &ObjectId) -> Result<Vec<Notification>, AppError> {
        find_many(&self.notifications(), doc! { "to": *to }, Some(newest_first())).await
    }

    async fn delete_notification(&self, id: &ObjectId, to: &ObjectId) -> Result<bool, AppError> {
        let result = self
            .notifications()
            .delete_one(doc! { "_id": *id, "to": *to }, None)
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_notifications_for_post(&self, post: &ObjectId) -> Result<u64, AppError> {
        let result = self
            .notifications()
            .delete_many(doc! { "post": *post }, None)
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_notifications_for_comment(
        &self,
        comment: &ObjectId,
    ) -> Result<u64, AppError> {
        let result = self
            .notifications()
            .delete_many(doc! { "comment": *comment }, None)
            .await?;
        Ok(result.deleted_count)
    }
}
