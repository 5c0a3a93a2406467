use chrono::{DateTime, Utc};
use mongodb::bson::{
    oid::ObjectId, serde_helpers::chrono_datetime_as_bson_datetime,
};
use serde::{Deserialize, Serialize};

/// Account document. Local accounts carry an argon2 `password`; accounts
/// provisioned from Clerk carry `clerk_id` instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub clerk_id: Option<String>,
    pub email: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default)]
    pub profile_pic: String,
    #[serde(default)]
    pub banner_image: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub followers: Vec<ObjectId>,
    #[serde(default)]
    pub following: Vec<ObjectId>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new_local(
        first_name: String,
        last_name: String,
        username: String,
        email: String,
        password_hash: String,
    ) -> Self {
        let mut user = Self::blank(email, username);
        user.first_name = first_name;
        user.last_name = last_name;
        user.password = Some(password_hash);
        user
    }

    pub fn new_clerk(
        clerk_id: String,
        email: String,
        username: String,
        first_name: String,
        last_name: String,
        profile_pic: String,
    ) -> Self {
        let mut user = Self::blank(email, username);
        user.clerk_id = Some(clerk_id);
        user.first_name = first_name;
        user.last_name = last_name;
        user.profile_pic = profile_pic;
        user
    }

    fn blank(email: String, username: String) -> Self {
        let now = Utc::now();
        Self {
            id: ObjectId::new(),
            clerk_id: None,
            email,
            username,
            first_name: String::new(),
            last_name: String::new(),
            password: None,
            profile_pic: String::new(),
            banner_image: String::new(),
            bio: String::new(),
            location: String::new(),
            followers: Vec::new(),
            following: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_following(&self, other: &ObjectId) -> bool {
        self.following.contains(other)
    }

    pub fn apply(&mut self, update: &ProfileUpdate) {
        if let Some(v) = &update.first_name {
            self.first_name = v.clone();
        }
        if let Some(v) = &update.last_name {
            self.last_name = v.clone();
        }
        if let Some(v) = &update.bio {
            self.bio = v.clone();
        }
        if let Some(v) = &update.location {
            self.location = v.clone();
        }
        if let Some(v) = &update.profile_pic {
            self.profile_pic = v.clone();
        }
        if let Some(v) = &update.banner_image {
            self.banner_image = v.clone();
        }
        self.updated_at = Utc::now();
    }
}

/// The subset of profile fields a user may change.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub profile_pic: Option<String>,
    pub banner_image: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == ProfileUpdate::default()
    }

    /// `$set` body for the changed fields, always bumping `updated_at`.
    pub fn to_set_document(&self) -> mongodb::bson::Document {
        let mut set = mongodb::bson::Document::new();
        let fields = [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("bio", &self.bio),
            ("location", &self.location),
            ("profile_pic", &self.profile_pic),
            ("banner_image", &self.banner_image),
        ];
        for (key, value) in fields {
            if let Some(v) = value {
                set.insert(key, v.as_str());
            }
        }
        set.insert("updated_at", mongodb::bson::DateTime::now());
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_touches_only_given_fields() {
        let mut user = User::new_local(
            "Ada".into(),
            "Lovelace".into(),
            "ada".into(),
            "ada@example.com".into(),
            "hash".into(),
        );
        user.apply(&ProfileUpdate {
            bio: Some("Analyst".into()),
            ..Default::default()
        });
        assert_eq!(user.bio, "Analyst");
        assert_eq!(user.first_name, "Ada");
    }

    #[test]
    fn set_document_skips_unset_fields() {
        let update = ProfileUpdate {
            location: Some("London".into()),
            ..Default::default()
        };
        let set = update.to_set_document();
        assert_eq!(set.get_str("location").unwrap(), "London");
        assert!(!set.contains_key("bio"));
        assert!(set.contains_key("updated_at"));
    }

    #[test]
    fn local_users_do_not_store_clerk_id() {
        let user = User::new_local(
            "A".into(),
            "B".into(),
            "ab".into(),
            "ab@example.com".into(),
            "hash".into(),
        );
        let doc = mongodb::bson::to_document(&user).unwrap();
        assert!(!doc.contains_key("clerk_id"));
        assert!(doc.contains_key("password"));
    }
}
