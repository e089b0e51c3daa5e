//! Router error types, including the provider `APIError` wrapper with
//! retryability predicates

use thiserror::Error;

/// A structured error surfaced by a provider's HTTP endpoint.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status_code: u16,
    pub code: String,
    pub error_type: String,
    pub message: String,
}

impl ApiError {
    pub fn new(status_code: u16, code: impl Into<String>, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code,
            code: code.into(),
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    pub fn is_rate_limit(&self) -> bool {
        self.status_code == 429
    }

    pub fn is_auth(&self) -> bool {
        self.status_code == 401 || self.status_code == 403
    }

    pub fn is_quota_exceeded(&self) -> bool {
        self.error_type == "quota_exceeded" || self.code == "insufficient_quota"
    }

    /// Transient: 5xx, 408, 429, 502/503/504. These mark the provider
    /// unhealthy and are retried with backoff.
    pub fn is_transient(&self) -> bool {
        matches!(self.status_code, 408 | 429 | 500..=599)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider error {} ({}): {}", self.status_code, self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("provider api error: {0}")]
    Provider(#[from] ApiError),
    #[error("request failed: {0}")]
    Transport(String),
    #[error("no healthy provider available for this request")]
    NoProviderAvailable,
    #[error("provider '{0}' is not registered")]
    UnknownProvider(String),
    #[error("request cancelled")]
    Cancelled,
}
