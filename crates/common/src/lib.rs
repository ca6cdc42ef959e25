//! Utilities shared between the unpack gateway service and its test harness.

#![warn(clippy::pedantic)]

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for JWT utilities (size limits, clock skew, iat and issuer checks)
pub mod jwt;
