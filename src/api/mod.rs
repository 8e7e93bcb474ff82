//! API layer
//!
//! Operational endpoints:
//! - Health check
//! - Metrics (Prometheus)

pub mod metrics;

pub use metrics::metrics_router;

use axum::{Router, routing::get};

/// Create the health check router
pub fn health_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new().route("/health", get(health_check))
}

async fn health_check() -> &'static str {
    "OK"
}
