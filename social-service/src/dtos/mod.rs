pub mod notifications;
pub mod posts;
pub mod users;

use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Hex form of a list of object ids.
pub(crate) fn hex_ids(ids: &[mongodb::bson::oid::ObjectId]) -> Vec<String> {
    ids.iter().map(|id| id.to_hex()).collect()
}
