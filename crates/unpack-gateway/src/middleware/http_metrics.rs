//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Captures every response including the router's own 404/405 answers for
//! sync routes that were not registered.

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records HTTP request metrics for all responses
///
/// Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::{get, post},
        Router,
    };
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_502() -> (StatusCode, &'static str) {
        (StatusCode::BAD_GATEWAY, "Upstream down")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/health", get(handler_200))
            .route("/api/gitlab/sync/jwt", post(handler_502))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    #[tokio::test]
    async fn test_middleware_passes_success_through() {
        let request = HttpRequest::builder()
            .method("GET")
            .uri("/health")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_middleware_passes_error_through() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/gitlab/sync/jwt?image=app")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_middleware_sees_unregistered_route() {
        let request = HttpRequest::builder()
            .method("POST")
            .uri("/api/github/sync/jwt")
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
