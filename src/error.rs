//! Error types for Sentinel
//!
//! Handler errors are converted to `AppError`, which implements
//! `IntoResponse` for proper HTTP error responses. The `requests` and
//! `github` layers keep their own error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::github::{self, GithubConfigError};
use crate::requests::NO_RESPONSE;

/// Application-wide error type
#[derive(Debug, Error)]
pub enum AppError {
    /// Authentication required (401)
    #[error("Authentication required")]
    Unauthorized,

    /// Validation error (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// GitHub API error (status depends on GitHub's answer)
    #[error("GitHub error: {0}")]
    Github(#[from] github::ResponseError),

    /// Configuration error (500)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Signing error (500)
    #[error("Signing error: {0}")]
    Signing(String),

    /// Internal server error (500)
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<GithubConfigError> for AppError {
    fn from(err: GithubConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Status returned to our client for a failed GitHub call.
fn github_status(code: u16) -> StatusCode {
    match code {
        401 => StatusCode::UNAUTHORIZED,
        403 => StatusCode::FORBIDDEN,
        404 => StatusCode::NOT_FOUND,
        NO_RESPONSE => StatusCode::GATEWAY_TIMEOUT,
        _ => StatusCode::BAD_GATEWAY,
    }
}

impl AppError {
    fn parts(&self) -> (StatusCode, String, &'static str) {
        match self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string(), "unauthorized"),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone(), "validation"),
            AppError::Github(err) => (github_status(err.code), err.message.clone(), "github"),
            AppError::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone(), "config"),
            AppError::Signing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "signing",
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
                "internal",
            ),
        }
    }
}

impl IntoResponse for AppError {
    /// Convert error to HTTP response
    ///
    /// Maps each error variant to appropriate HTTP status code
    /// and JSON error body.
    fn into_response(self) -> Response {
        use axum::Json;

        let (status, error_message, error_type) = self.parts();

        if status.is_server_error() {
            tracing::error!(error = %self, error_type, "Request failed");
        }

        use crate::metrics::ERRORS_TOTAL;
        ERRORS_TOTAL.with_label_values(&[error_type]).inc();

        let body = match &self {
            AppError::Github(err) => Json(serde_json::json!({
                "error": error_message,
                "github_code": err.code,
            })),
            _ => Json(serde_json::json!({
                "error": error_message,
            })),
        };

        (status, body).into_response()
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;
