use service_core::error::AppError;
use thiserror::Error;

/// Failures talking to Clerk or the image host.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Provider not enabled: {0}")]
    NotEnabled(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Authentication error: {0}")]
    Authentication(String),
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotEnabled(msg) => {
                tracing::warn!(reason = %msg, "Provider disabled");
                AppError::ServiceUnavailable
            }
            ProviderError::NotFound(msg) => AppError::not_found(msg),
            ProviderError::InvalidInput(msg) => AppError::bad_request(msg),
            other => AppError::BadGateway(other.to_string()),
        }
    }
}
