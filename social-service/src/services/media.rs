use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sha1::{Digest, Sha1};
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use super::ProviderError;
use crate::config::CloudinaryConfig;

const CLOUDINARY_API_URL: &str = "https://api.cloudinary.com/v1_1";

#[derive(Debug, Clone, PartialEq)]
pub struct HostedImage {
    pub url: String,
    /// `None` when the image is only linked, not hosted by us.
    pub public_id: Option<String>,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    /// `source` is a data URI or a remote URL.
    async fn upload(&self, source: &str) -> Result<HostedImage, ProviderError>;
    async fn destroy(&self, public_id: &str) -> Result<(), ProviderError>;
    fn is_enabled(&self) -> bool;
}

pub struct CloudinaryProvider {
    config: CloudinaryConfig,
    client: Client,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    secure_url: String,
    public_id: String,
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

impl CloudinaryProvider {
    pub fn new(config: CloudinaryConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/{}/image/{}",
            CLOUDINARY_API_URL, self.config.cloud_name, action
        )
    }
}

/// Maps a failed upload status. Only payload problems are the caller's fault;
/// credential and server failures are upstream errors.
fn upload_error(status: StatusCode) -> ProviderError {
    match status {
        StatusCode::BAD_REQUEST
        | StatusCode::PAYLOAD_TOO_LARGE
        | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
            ProviderError::InvalidInput("Image could not be processed".to_string())
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            ProviderError::Authentication(format!("Cloudinary rejected credentials ({})", status))
        }
        other => ProviderError::RequestFailed(format!("Cloudinary returned {}", other)),
    }
}

/// Cloudinary request signature: SHA-1 hex of the `key=value` pairs sorted by
/// key and joined with `&`, followed directly by the API secret.
pub fn sign_params(params: &[(&str, &str)], api_secret: &str) -> String {
    let mut sorted = params.to_vec();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let to_sign = sorted
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    hex::encode(Sha1::digest(format!("{}{}", to_sign, api_secret).as_bytes()))
}

#[async_trait]
impl ImageHost for CloudinaryProvider {
    async fn upload(&self, source: &str) -> Result<HostedImage, ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "Cloudinary is not configured".to_string(),
            ));
        }

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[
                ("folder", self.config.folder.as_str()),
                ("timestamp", timestamp.as_str()),
            ],
            &self.config.api_secret,
        );

        let form = [
            ("file", source),
            ("api_key", self.config.api_key.as_str()),
            ("folder", self.config.folder.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to Cloudinary: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = %status, body = %body, "Cloudinary upload failed");
            return Err(upload_error(status));
        }

        let uploaded: UploadResponse = response.json().await.map_err(|e| {
            ProviderError::RequestFailed(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        tracing::info!(public_id = %uploaded.public_id, "Image uploaded to Cloudinary");

        Ok(HostedImage {
            url: uploaded.secure_url,
            public_id: Some(uploaded.public_id),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ProviderError> {
        if !self.config.enabled {
            return Err(ProviderError::NotEnabled(
                "Cloudinary is not configured".to_string(),
            ));
        }

        let timestamp = Utc::now().timestamp().to_string();
        let signature = sign_params(
            &[("public_id", public_id), ("timestamp", timestamp.as_str())],
            &self.config.api_secret,
        );

        let form = [
            ("public_id", public_id),
            ("api_key", self.config.api_key.as_str()),
            ("timestamp", timestamp.as_str()),
            ("signature", signature.as_str()),
        ];

        let response = self
            .client
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(|e| {
                ProviderError::Connection(format!("Failed to connect to Cloudinary: {}", e))
            })?;

        if !response.status().is_success() {
            return Err(ProviderError::RequestFailed(format!(
                "Cloudinary destroy returned {}",
                response.status()
            )));
        }

        let result: DestroyResponse = response.json().await.map_err(|e| {
            ProviderError::RequestFailed(format!("Failed to parse Cloudinary response: {}", e))
        })?;

        match result.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(ProviderError::RequestFailed(format!(
                "Cloudinary destroy result: {}",
                other
            ))),
        }
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}

/// Used when no image host is configured: remote URLs are stored as given,
/// inline uploads are refused.
pub struct LinkOnlyImageHost;

#[async_trait]
impl ImageHost for LinkOnlyImageHost {
    async fn upload(&self, source: &str) -> Result<HostedImage, ProviderError> {
        if source.starts_with("https://") || source.starts_with("http://") {
            return Ok(HostedImage {
                url: source.to_string(),
                public_id: None,
            });
        }

        Err(ProviderError::InvalidInput(
            "Image uploads are not enabled; provide an image URL".to_string(),
        ))
    }

    async fn destroy(&self, _public_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Records uploads and deletions instead of calling a real host.
#[derive(Default)]
pub struct MockImageHost {
    upload_count: AtomicU64,
    destroyed: Mutex<Vec<String>>,
}

impl MockImageHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upload_count(&self) -> u64 {
        self.upload_count.load(Ordering::SeqCst)
    }

    pub fn destroyed(&self) -> Vec<String> {
        self.destroyed
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ImageHost for MockImageHost {
    async fn upload(&self, source: &str) -> Result<HostedImage, ProviderError> {
        if source.is_empty() {
            return Err(ProviderError::InvalidInput("Empty image".to_string()));
        }

        let n = self.upload_count.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::info!(n, "[MOCK] Image would be uploaded");

        Ok(HostedImage {
            url: format!("https://images.test/mock-{}.png", n),
            public_id: Some(format!("mock-{}", n)),
        })
    }

    async fn destroy(&self, public_id: &str) -> Result<(), ProviderError> {
        if let Ok(mut destroyed) = self.destroyed.lock() {
            destroyed.push(public_id.to_string());
        }
        Ok(())
    }

    fn is_enabled(&self) -> bool {
        true
    }
}
