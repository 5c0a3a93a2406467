use chrono::{DateTime, Utc};
use mongodb::bson::{oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Follow,
    Like,
    Comment,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Follow => "follow",
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub from: ObjectId,
    pub to: ObjectId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default)]
    pub post: Option<ObjectId>,
    #[serde(default)]
    pub comment: Option<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn follow(from: ObjectId, to: ObjectId) -> Self {
        Self::new(from, to, NotificationKind::Follow, None, None)
    }

    pub fn like(from: ObjectId, to: ObjectId, post: ObjectId) -> Self {
        Self::new(from, to, NotificationKind::Like, Some(post), None)
    }

    pub fn comment(from: ObjectId, to: ObjectId, post: ObjectId, comment: ObjectId) -> Self {
        Self::new(from, to, NotificationKind::Comment, Some(post), Some(comment))
    }

    fn new(
        from: ObjectId,
        to: ObjectId,
        kind: NotificationKind,
        post: Option<ObjectId>,
        comment: Option<ObjectId>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            from,
            to,
            kind,
            post,
            comment,
            created_at: Utc::now(),
        }
    }
}
