//! Unpack Gateway Library
//!
//! An authenticating relay between CI providers and the pipeline that unpacks
//! updated container images. A CI job reports a new image to
//! `POST /api/{gitlab|github}/sync/{jwt|secret}?image=...`; the gateway
//! authenticates the caller and starts the configured pipeline with that
//! image as input.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> middleware/auth.rs -> handlers/sync.rs -> services/*.rs
//! ```
//!
//! Signing keys are fetched once at startup and held in an immutable
//! `AppState`. Which sync routes exist is decided once, from configuration.
//!
//! # Modules
//!
//! - `auth` - JWKS fetching, JWT validation, shared-secret comparison
//! - `capabilities` - Startup-time route table
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication and HTTP metrics layers
//! - `models` - Data models
//! - `observability` - Prometheus metrics
//! - `routes` - Application state and Axum router setup
//! - `services` - Pipeline trigger clients

pub mod auth;
pub mod capabilities;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
