//! Caller authentication.
//!
//! - `jwks`: fetches provider signing keys once at startup
//! - `jwt`: validates CI job tokens against those keys
//! - `claims`: validated token claims
//! - `secret`: shared-secret comparison

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod secret;
