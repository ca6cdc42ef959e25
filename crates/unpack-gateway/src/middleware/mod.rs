//! Middleware for the unpack gateway.
//!
//! # Components
//!
//! - `auth` - JWT and shared-secret authentication for sync routes
//! - `http_metrics` - HTTP metrics for every response

pub mod auth;
pub mod http_metrics;

pub use auth::{require_jwt, require_shared_secret, JwtAuthState, SecretAuthState};
pub use http_metrics::http_metrics_middleware;
