use mongodb::bson::oid::ObjectId;
use service_core::error::AppError;
use std::sync::Arc;

use super::{metrics, ClerkApi, NotificationService, SocialStore, TokenService, DUPLICATE_USER};
use crate::dtos::users::{LoginRequest, SignUpRequest};
use crate::middleware::Identity;
use crate::models::{Notification, ProfileUpdate, User};
use crate::utils::{hash_password, verify_password, Password, PasswordHashString};

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Signup, login, Clerk provisioning, profiles and the follow graph.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn SocialStore>,
    tokens: TokenService,
    clerk: Arc<dyn ClerkApi>,
    notifications: NotificationService,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn SocialStore>,
        tokens: TokenService,
        clerk: Arc<dyn ClerkApi>,
        notifications: NotificationService,
    ) -> Self {
        Self {
            store,
            tokens,
            clerk,
            notifications,
        }
    }

    /// Creates a local account and returns it with a fresh token.
    pub async fn signup(&self, req: SignUpRequest) -> Result<(User, String), AppError> {
        let req = req.normalized().map_err(AppError::bad_request)?;

        if self.store.user_exists(&req.email, &req.user_name).await? {
            return Err(AppError::bad_request(DUPLICATE_USER));
        }

        let hash = hash_password(&Password::new(req.password))?;
        let user = User::new_local(
            req.first_name,
            req.last_name,
            req.user_name,
            req.email,
            hash.into_string(),
        );
        self.store.insert_user(&user).await?;

        let token = self.tokens.issue(&user.id)?;
        metrics::record_signup("local");
        tracing::info!(user_id = %user.id, username = %user.username, "User signed up");

        Ok((user, token))
    }

    pub async fn login(&self, req: LoginRequest) -> Result<(User, String), AppError> {
        let email = req.email.trim().to_lowercase();

        let user = self
            .store
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| AppError::bad_request(INVALID_CREDENTIALS))?;

        // Clerk-provisioned accounts have no local password.
        let Some(stored) = user.password.as_deref() else {
            return Err(AppError::bad_request(INVALID_CREDENTIALS));
        };

        if !verify_password(&Password::new(req.password), &PasswordHashString::new(stored))? {
            tracing::info!(user_id = %user.id, "Login rejected: wrong password");
            return Err(AppError::bad_request(INVALID_CREDENTIALS));
        }

        let token = self.tokens.issue(&user.id)?;
        tracing::info!(user_id = %user.id, "User logged in");
        Ok((user, token))
    }

    /// Stored profile behind an authenticated identity, if any.
    pub async fn resolve(&self, identity: &Identity) -> Result<Option<User>, AppError> {
        match identity {
            Identity::Clerk { user_id, .. } => self.store.find_user_by_clerk_id(user_id).await,
            Identity::Local { user_id } => self.store.find_user_by_id(user_id).await,
        }
    }

    pub async fn profile(&self, username: &str) -> Result<User, AppError> {
        self.store
            .find_user_by_username(username)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))
    }

    pub async fn update_profile(
        &self,
        user: &User,
        update: ProfileUpdate,
    ) -> Result<User, AppError> {
        if update.is_empty() {
            return Ok(user.clone());
        }

        let updated = self
            .store
            .update_user_profile(&user.id, &update)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        tracing::info!(user_id = %user.id, "Profile updated");
        Ok(updated)
    }

    /// Finds or provisions the local profile of a Clerk user. The flag is
    /// `true` when the profile was created by this call.
    pub async fn sync_clerk_user(&self, clerk_user_id: &str) -> Result<(User, bool), AppError> {
        if let Some(user) = self.store.find_user_by_clerk_id(clerk_user_id).await? {
            return Ok((user, false));
        }

        let clerk_user = self.clerk.get_user(clerk_user_id).await?;
        let email = clerk_user
            .primary_email()
            .map(|e| e.trim().to_lowercase())
            .filter(|e| !e.is_empty())
            .ok_or_else(|| AppError::bad_request("Clerk user has no email address"))?;

        let base = email.split('@').next().unwrap_or_default().to_string();
        let username = if self.store.find_user_by_username(&base).await?.is_some() {
            // Email local part taken: disambiguate with the tail of the Clerk id.
            let skip = clerk_user_id.chars().count().saturating_sub(6);
            let tail: String = clerk_user_id.chars().skip(skip).collect();
            format!("{}_{}", base, tail.to_lowercase())
        } else {
            base
        };

        let user = User::new_clerk(
            clerk_user.id.clone(),
            email,
            username,
            clerk_user.first_name.clone().unwrap_or_default(),
            clerk_user.last_name.clone().unwrap_or_default(),
            clerk_user.image_url.clone().unwrap_or_default(),
        );
        self.store.insert_user(&user).await?;

        metrics::record_signup("clerk");
        tracing::info!(user_id = %user.id, clerk_id = %clerk_user_id, "Clerk user provisioned");
        Ok((user, true))
    }

    /// Follows or unfollows `target_id`; returns whether the caller now
    /// follows the target.
    pub async fn toggle_follow(&self, caller: &User, target_id: &str) -> Result<bool, AppError> {
        let target_id = ObjectId::parse_str(target_id)?;

        if target_id == caller.id {
            return Err(AppError::bad_request("You cannot follow yourself"));
        }

        let target = self
            .store
            .find_user_by_id(&target_id)
            .await?
            .ok_or_else(|| AppError::not_found("User not found"))?;

        let following = !caller.is_following(&target.id);
        let changed = self
            .store
            .set_following(&caller.id, &target.id, following)
            .await?;

        // A concurrent request may already have added the edge.
        if following && changed {
            self.notifications
                .notify(Notification::follow(caller.id, target.id))
                .await?;
        }

        metrics::record_follow(following);
        tracing::info!(
            follower = %caller.id,
            target = %target.id,
            following,
            "Follow toggled"
        );
        Ok(following)
    }
}
