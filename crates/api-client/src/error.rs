//! Error types for the API gateway client.

use platewise_core::{classify_http_status, RetryClass};
use platewise_storage_kv::StorageError;
use thiserror::Error;

/// Result type alias for gateway operations.
pub type Result<T> = std::result::Result<T, ApiError>;

/// Errors that can surface from the gateway after local recovery has been
/// ruled out.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Application error response from the backend
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Authentication failure; the stored token has already been cleared
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Local storage failed while recording or substituting a response
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Create an API error from status and message
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create an auth error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status if this is an API error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True when the failure is transport-level unreachability (connection
    /// refused, timeout) rather than a server verdict.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_connect() || e.is_timeout())
    }

    /// Classify error for retry policy.
    pub fn retry_class(&self) -> RetryClass {
        match self {
            Self::Api { status, .. } => classify_http_status(*status),
            Self::Http(_) => RetryClass::Retryable,
            Self::Json(_) | Self::Storage(_) => RetryClass::Permanent,
            Self::Auth(_) => RetryClass::ReauthRequired,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_class_for_auth_error_is_reauth() {
        let err = ApiError::api(401, "unauthorized");
        assert_eq!(err.retry_class(), RetryClass::ReauthRequired);
        assert_eq!(ApiError::auth("cleared").retry_class(), RetryClass::ReauthRequired);
    }

    #[test]
    fn status_code_only_for_api_errors() {
        assert_eq!(ApiError::api(502, "bad gateway").status_code(), Some(502));
        assert_eq!(ApiError::auth("nope").status_code(), None);
    }
}
