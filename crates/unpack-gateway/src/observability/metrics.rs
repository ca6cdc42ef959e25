//! Metrics definitions for the unpack gateway.
//!
//! All metrics follow Prometheus naming conventions:
//! - `ug_` prefix for the unpack gateway
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 8 values (static routes plus "/other")
//! - `status`: 3 values (success, error, timeout)
//! - `provider`: 2 values (gitlab, github)
//! - `scheme`: 2 values (jwt, secret)
//! - `outcome`: bounded by rejection variants

use metrics::counter;
use metrics::histogram;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("ug_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Trigger calls are dominated by the CI provider's API latency
        .set_buckets_for_metric(
            Matcher::Prefix("ug_trigger".to_string()),
            &[0.050, 0.100, 0.250, 0.500, 1.000, 2.000, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set trigger buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `ug_http_requests_total`, `ug_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
///
/// Captures every response, including 404s for sync routes that were not
/// registered.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("ug_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("ug_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/" => "/",
        "/health" => "/health",
        "/metrics" => "/metrics",
        "/api/gitlab/sync/jwt" => "/api/gitlab/sync/jwt",
        "/api/gitlab/sync/secret" => "/api/gitlab/sync/secret",
        "/api/github/sync/jwt" => "/api/github/sync/jwt",
        "/api/github/sync/secret" => "/api/github/sync/secret",
        _ => "/other",
    }
}

// ============================================================================
// Authentication Metrics
// ============================================================================

/// Record an authentication attempt on a sync route
///
/// Metric: `ug_auth_attempts_total`
/// Labels: `provider`, `scheme`, `outcome`
///
/// `outcome` is "success" or a bounded rejection label such as
/// "missing_credential", "bad_signature" or "invalid_issuer".
pub fn record_auth_result(provider: &str, scheme: &str, outcome: &'static str) {
    counter!("ug_auth_attempts_total",
        "provider" => provider.to_string(),
        "scheme" => scheme.to_string(),
        "outcome" => outcome
    )
    .increment(1);
}

// ============================================================================
// Pipeline Trigger Metrics
// ============================================================================

/// Record a pipeline trigger call
///
/// Metric: `ug_trigger_requests_total`, `ug_trigger_duration_seconds`
/// Labels: `provider`, `status`
///
/// `status` is "success", "rejected" (non-2xx from the provider) or
/// "unavailable" (transport failure).
pub fn record_trigger(provider: &str, status: &'static str, duration: Duration) {
    histogram!("ug_trigger_duration_seconds",
        "provider" => provider.to_string(),
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("ug_trigger_requests_total",
        "provider" => provider.to_string(),
        "status" => status
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a JWKS fetch at startup
///
/// Metric: `ug_jwks_fetch_total`
/// Labels: `provider`, `status`
pub fn record_jwks_fetch(provider: &str, status: &'static str) {
    counter!("ug_jwks_fetch_total",
        "provider" => provider.to_string(),
        "status" => status
    )
    .increment(1);
}
