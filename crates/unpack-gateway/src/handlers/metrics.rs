//! Prometheus metrics endpoint handler.
//!
//! This endpoint is unauthenticated to allow Prometheus to scrape metrics.
//! Labels carry only bounded operational values: no image references,
//! token subjects or secrets.

use axum::{extract::State, response::IntoResponse};
use metrics_exporter_prometheus::PrometheusHandle;

/// Handler for GET /metrics
///
/// # Response
///
/// Returns 200 OK with Prometheus text format:
/// ```text
/// # TYPE ug_http_requests_total counter
/// ug_http_requests_total{method="POST",endpoint="/api/gitlab/sync/jwt",status_code="200"} 42
/// ```
#[tracing::instrument(skip_all, name = "ug.metrics.scrape")]
pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    handle.render()
}

// The endpoint needs a PrometheusHandle, which can only be installed once per
// process; tests/health_tests.rs covers it through the test server.
