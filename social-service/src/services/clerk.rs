use async_trait::async_trait;
use dashmap::DashMap;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use service_core::error::AppError;

use super::ProviderError;
use crate::config::ClerkConfig;

/// Claims carried by a Clerk session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkClaims {
    /// Clerk user id (`user_...`)
    pub sub: String,
    /// Session id
    #[serde(default)]
    pub sid: Option<String>,
    /// Origin that requested the token
    #[serde(default)]
    pub azp: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub iat: Option<i64>,
}

/// Networkless verification of Clerk session tokens against the instance's
/// PEM public key.
#[derive(Clone)]
pub struct ClerkSessionVerifier {
    key: Option<DecodingKey>,
    authorized_parties: Vec<String>,
}

impl ClerkSessionVerifier {
    pub fn new(config: &ClerkConfig) -> Result<Self, anyhow::Error> {
        let key = match &config.jwt_public_key {
            Some(pem) => Some(
                DecodingKey::from_rsa_pem(pem.as_bytes())
                    .map_err(|e| anyhow::anyhow!("Failed to parse CLERK_JWT_KEY: {}", e))?,
            ),
            None => None,
        };

        if key.is_none() {
            tracing::info!("CLERK_JWT_KEY not set; Clerk session tokens will be rejected");
        }

        Ok(Self {
            key,
            authorized_parties: config.authorized_parties.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.key.is_some()
    }

    pub fn verify(&self, token: &str) -> Result<ClerkClaims, AppError> {
        let key = self
            .key
            .as_ref()
            .ok_or_else(|| AppError::unauthorized("Unauthorized access"))?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.validate_aud = false;
        validation.validate_nbf = true;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let claims = decode::<ClerkClaims>(token, key, &validation)?.claims;

        if let Some(azp) = &claims.azp {
            if !self.authorized_parties.is_empty() && !self.authorized_parties.contains(azp) {
                tracing::warn!(azp = %azp, "Clerk token issued for an unauthorized party");
                return Err(AppError::unauthorized("Unauthorized access"));
            }
        }

        Ok(claims)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkEmailAddress {
    pub id: String,
    pub email_address: String,
}

/// Subset of the Backend API user object used to provision local profiles.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClerkUser {
    pub id: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub email_addresses: Vec<ClerkEmailAddress>,
    #[serde(default)]
    pub primary_email_address_id: Option<String>,
}

impl ClerkUser {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            first_name: None,
            last_name: None,
            image_url: None,
            email_addresses: vec![ClerkEmailAddress {
                id: "idn_primary".to_string(),
                email_address: email.into(),
            }],
            primary_email_address_id: Some("idn_primary".to_string()),
        }
    }

    pub fn with_names(mut self, first: &str, last: &str) -> Self {
        self.first_name = Some(first.to_string());
        self.last_name = Some(last.to_string());
        self
    }

    /// Primary address when flagged, otherwise the first one listed.
    pub fn primary_email(&self) -> Option<&str> {
        self.primary_email_address_id
            .as_ref()
            .and_then(|pid| self.email_addresses.iter().find(|e| &e.id == pid))
            .or_else(|| self.email_addresses.first())
            .map(|e| e.email_address.as_str())
    }
}

#[async_trait]
pub trait ClerkApi: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<ClerkUser, ProviderError>;
    fn is_enabled(&self) -> bool;
}

pub struct HttpClerkClient {
    client: Client,
    api_url: String,
    secret_key: Option<String>,
}

impl HttpClerkClient {
    pub fn new(config: &ClerkConfig) -> Self {
        Self {
            client: Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        }
    }
}

#[async_trait]
impl ClerkApi for HttpClerkClient {
    async fn get_user(&self, user_id: &str) -> Result<ClerkUser, ProviderError> {
        let secret = self.secret_key.as_ref().ok_or_else(|| {
            ProviderError::NotEnabled("CLERK_SECRET_KEY is not configured".to_string())
        })?;

        let response = self
            .client
            .get(format!("{}/users/{}", self.api_url, user_id))
            .bearer_auth(secret)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(format!("Failed to reach Clerk: {}", e)))?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ProviderError::NotFound("User not found".to_string()));
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                return Err(ProviderError::Authentication(
                    "Clerk rejected the secret key".to_string(),
                ));
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::RequestFailed(format!(
                    "Clerk returned {}: {}",
                    status, body
                )));
            }
        }

        response.json::<ClerkUser>().await.map_err(|e| {
            ProviderError::RequestFailed(format!("Failed to parse Clerk user: {}", e))
        })
    }

    fn is_enabled(&self) -> bool {
        self.secret_key.is_some()
    }
}

/// In-process stand-in for the Clerk Backend API.
#[derive(Default)]
pub struct MockClerkClient {
    users: DashMap<String, ClerkUser>,
}

impl MockClerkClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, user: ClerkUser) {
        self.users.insert(user.id.clone(), user);
    }
}

#[async_trait]
impl ClerkApi for MockClerkClient {
    async fn get_user(&self, user_id: &str) -> Result<ClerkUser, ProviderError> {
        self.users
            .get(user_id)
            .map(|u| u.value().clone())
            .ok_or_else(|| ProviderError::NotFound("User not found".to_string()))
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
