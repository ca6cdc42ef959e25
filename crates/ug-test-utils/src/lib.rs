//! # Unpack Gateway Test Utilities
//!
//! Shared test utilities for the unpack gateway.
//!
//! This crate provides:
//! - Deterministic crypto fixtures (fixed Ed25519 seeds and an RSA test key)
//! - Test data builders (`TestTokenBuilder` for CI job token claims)
//! - Server test harness (`TestGatewayServer` with mocked GitLab and GitHub)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ug_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let server = TestGatewayServer::builder().with_gitlab().spawn().await?;
//!     server.mount_gitlab_trigger(201, "{}").await;
//!
//!     let token = TestTokenBuilder::gitlab(&server.gitlab_issuer())
//!         .sign(server.gitlab_key());
//!
//!     let response = reqwest::Client::new()
//!         .post(format!("{}/api/gitlab/sync/jwt?image=app:1", server.url()))
//!         .bearer_auth(token)
//!         .send()
//!         .await?;
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;
