//! Prometheus metrics registry and instruments.
//!
//! This module is framework-agnostic and can be used from any layer.

use std::sync::Once;

use lazy_static::lazy_static;
use prometheus::{HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry};

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Outbound HTTP Metrics
    pub static ref OUTBOUND_REQUESTS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sentinel_outbound_requests_total", "Total number of outbound HTTP requests"),
        &["method", "status"]
    ).expect("metric can be created");
    pub static ref OUTBOUND_REQUEST_DURATION_SECONDS: HistogramVec = HistogramVec::new(
        HistogramOpts::new(
            "sentinel_outbound_request_duration_seconds",
            "Outbound HTTP request duration in seconds"
        ).buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0]),
        &["method"]
    ).expect("metric can be created");

    // GitHub Metrics
    pub static ref GITHUB_ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sentinel_github_errors_total", "Total number of failed GitHub API calls"),
        &["operation", "code"]
    ).expect("metric can be created");

    // Error Metrics
    pub static ref ERRORS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("sentinel_errors_total", "Total number of errors returned to clients"),
        &["error_type"]
    ).expect("metric can be created");
}

static INIT: Once = Once::new();

/// Initialize metrics registry.
///
/// Safe to call more than once; only the first call registers.
pub fn init_metrics() {
    INIT.call_once(|| {
        REGISTRY
            .register(Box::new(OUTBOUND_REQUESTS_TOTAL.clone()))
            .expect("OUTBOUND_REQUESTS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(OUTBOUND_REQUEST_DURATION_SECONDS.clone()))
            .expect("OUTBOUND_REQUEST_DURATION_SECONDS can be registered");
        REGISTRY
            .register(Box::new(GITHUB_ERRORS_TOTAL.clone()))
            .expect("GITHUB_ERRORS_TOTAL can be registered");
        REGISTRY
            .register(Box::new(ERRORS_TOTAL.clone()))
            .expect("ERRORS_TOTAL can be registered");

        tracing::info!("Metrics registry initialized");
    });
}
