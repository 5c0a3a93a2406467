use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::hex_ids;
use crate::models::{ProfileUpdate, User};

const REQUIRED: &str = "All fields are required";

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub first_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub last_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub user_name: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub password: String,
}

impl SignUpRequest {
    /// Trims identity fields; whitespace-only input counts as missing.
    pub fn normalized(self) -> Result<Self, &'static str> {
        let req = Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            user_name: self.user_name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password: self.password,
        };
        let blank = [&req.first_name, &req.last_name, &req.user_name, &req.email]
            .iter()
            .any(|v| v.is_empty());
        if blank || req.password.is_empty() {
            return Err(REQUIRED);
        }
        Ok(req)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub email: String,

    #[serde(default)]
    #[validate(length(min = 1, message = "All fields are required"))]
    pub password: String,
}

/// Only these profile fields can be changed through `PUT /profile`; anything
/// else in the body is ignored.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters"))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters"))]
    pub last_name: Option<String>,

    #[validate(length(max = 160, message = "Bio must be at most 160 characters"))]
    pub bio: Option<String>,

    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,

    pub profile_pic: Option<String>,

    pub banner_image: Option<String>,
}

impl From<UpdateProfileRequest> for ProfileUpdate {
    fn from(req: UpdateProfileRequest) -> Self {
        ProfileUpdate {
            first_name: req.first_name,
            last_name: req.last_name,
            bio: req.bio,
            location: req.location,
            profile_pic: req.profile_pic,
            banner_image: req.banner_image,
        }
    }
}

/// Identity block returned alongside a fresh token.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
}

impl From<&User> for AccountSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: AccountSummary,
}

/// Public profile. Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clerk_id: Option<String>,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub profile_pic: String,
    pub banner_image: String,
    pub bio: String,
    pub location: String,
    pub followers: Vec<String>,
    pub following: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            clerk_id: user.clerk_id.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.username.clone(),
            email: user.email.clone(),
            profile_pic: user.profile_pic.clone(),
            banner_image: user.banner_image.clone(),
            bio: user.bio.clone(),
            location: user.location.clone(),
            followers: hex_ids(&user.followers),
            following: hex_ids(&user.following),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Owner block embedded in posts and comments.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub user_name: String,
    pub email: String,
    pub profile_pic: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_hex(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            user_name: user.username.clone(),
            email: user.email.clone(),
            profile_pic: user.profile_pic.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct SyncResponse {
    pub user: UserResponse,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub message: String,
    pub following: bool,
}
