//! The gateway's single HTTP error surface.
//!
//! `{error: <lowercased code>, code: <UPPER_SNAKE>, message: <human>}`
//! with status 400/404/500. Every handler returns `Result<T, ApiError>`; this
//! is the only place that maps to a wire response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Stable error codes surfaced to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Validation,
    NotFound,
    PolicyDenied,
    MissingTenant,
    Internal,
}

impl ErrorCode {
    fn as_upper_snake(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::NotFound => "NOT_FOUND",
            Self::PolicyDenied => "POLICY_DENIED",
            Self::MissingTenant => "MISSING_TENANT",
            Self::Internal => "INTERNAL",
        }
    }

    fn status(self) -> StatusCode {
        match self {
            Self::Validation | Self::MissingTenant => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PolicyDenied => StatusCode::FORBIDDEN,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// The error type every gateway handler returns.
#[derive(Debug, Clone)]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn policy_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::PolicyDenied, message)
    }

    pub fn missing_tenant() -> Self {
        Self::new(ErrorCode::MissingTenant, "X-Tenant-ID header is required")
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.code == ErrorCode::Internal {
            tracing::error!(message = %self.message, "internal error");
        } else {
            tracing::warn!(code = ?self.code, message = %self.message, "request rejected");
        }

        let body = ErrorBody {
            error: self.code.as_upper_snake().to_lowercase(),
            code: self.code.as_upper_snake(),
            message: self.message,
        };

        (self.code.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_upper_snake() {
        assert_eq!(ErrorCode::NotFound.as_upper_snake(), "NOT_FOUND");
        assert_eq!(ErrorCode::MissingTenant.as_upper_snake(), "MISSING_TENANT");
    }

    #[test]
    fn status_codes_match_spec() {
        assert_eq!(ErrorCode::Validation.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorCode::Internal.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
