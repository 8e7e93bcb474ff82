//! Sentinel - a thin oAuth bridge to GitHub
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - oAuth bridge endpoints (auth url, token, profile, logout) │
//! │  - Health and metrics                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     GitHub API Client                        │
//! │  - Authorization URL, token exchange, profile               │
//! │  - GitHub error body translation                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    HTTP Request Layer                        │
//! │  - Async GET/POST (reqwest)                                 │
//! │  - Query strings, form bodies, uniform response errors      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `requests`: Async HTTP requests and `Params`
//! - `github`: GitHub v3 API client
//! - `auth`: oAuth bridge endpoints
//! - `api`: Health and metrics endpoints
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod github;
pub mod metrics;
pub mod requests;

use std::sync::Arc;
use std::time::Duration;

/// Application state shared across all handlers
///
/// Cloned for each request; everything inside is read-only.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// GitHub API client
    pub github: github::Github,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Errors
    /// Returns error if the GitHub configuration is invalid or the HTTP
    /// client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        let http = requests::HttpClient::with_settings(
            Duration::from_secs(config.http.timeout_seconds),
            &config.http.user_agent,
        )
        .map_err(|e| error::AppError::Internal(e.into()))?;

        Self::with_http_client(config, http)
    }

    /// Initialize application state around an existing HTTP client.
    pub fn with_http_client(
        config: config::AppConfig,
        http: requests::HttpClient,
    ) -> Result<Self, error::AppError> {
        let github = github::Github::with_http_client(config.github_client_config()?, http);

        tracing::info!(
            auth_url = %github.config().auth_url(),
            token_url = %github.config().token_url(),
            profile_url = %github.config().profile_url(),
            "GitHub client initialized"
        );

        Ok(Self {
            config: Arc::new(config),
            github,
        })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use tower_http::trace::TraceLayer;

    let mount_point = state.config.server.mount_point.clone();

    auth::mount(api::health_router(), &mount_point)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(api::metrics_router())
}
