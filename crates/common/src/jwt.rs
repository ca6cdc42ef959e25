//! JWT utilities shared by the gateway and its test harness.
//!
//! This module provides the provider-independent pieces of token validation:
//! - Size limits checked before any parsing
//! - Clock skew constants for `exp`/`iat` validation
//! - `iat` validation logic
//! - Issuer comparison
//! - Ed25519 JWK key decoding
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{check_token_size, validate_iat, issuers_match, DEFAULT_CLOCK_SKEW};
//!
//! check_token_size(token)?;
//! // ... verify signature with a key from the provider's JWKS ...
//! validate_iat(claims.iat, DEFAULT_CLOCK_SKEW)?;
//! if !issuers_match(&claims.iss, expected_issuer) {
//!     // reject
//! }
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// CI job tokens issued by GitLab and GitHub are 1-2KB. Anything larger than
/// this is rejected before base64 decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Default JWT clock skew tolerance (5 minutes).
///
/// Applied as leeway on `exp` and as the upper bound for `iat` in the future.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(300);

/// Maximum allowed JWT clock skew tolerance (10 minutes).
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors raised by the shared validation helpers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("token exceeds {MAX_JWT_SIZE_BYTES} bytes")]
    TokenTooLarge,

    /// Token `iat` claim is too far in the future.
    #[error("token issued-at is too far in the future")]
    IatTooFarInFuture,
}

// =============================================================================
// Functions
// =============================================================================

/// Reject tokens larger than [`MAX_JWT_SIZE_BYTES`].
///
/// # Errors
///
/// Returns `JwtValidationError::TokenTooLarge` if the token exceeds the limit.
pub fn check_token_size(token: &str) -> Result<(), JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }
    Ok(())
}

/// Validate the `iat` (issued-at) claim with clock skew tolerance.
///
/// # Errors
///
/// Returns `JwtValidationError::IatTooFarInFuture` if the iat timestamp is more than
/// `clock_skew` in the future.
pub fn validate_iat(iat: i64, clock_skew: Duration) -> Result<(), JwtValidationError> {
    let now = chrono::Utc::now().timestamp();
    validate_iat_at(iat, clock_skew, now)
}

/// Deterministic `iat` validation against an explicit `now` timestamp.
pub(crate) fn validate_iat_at(
    iat: i64,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    // clock_skew is bounded to MAX_CLOCK_SKEW by config validation
    #[allow(clippy::cast_possible_wrap)]
    let clock_skew_secs = clock_skew.as_secs() as i64;
    let max_iat = now + clock_skew_secs;

    if iat > max_iat {
        tracing::debug!(
            target: "common.jwt",
            iat = iat,
            now = now,
            max_allowed = max_iat,
            clock_skew_secs = clock_skew_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(JwtValidationError::IatTooFarInFuture);
    }

    Ok(())
}

/// Compare an `iss` claim with the configured issuer URL.
///
/// A single trailing `/` is ignored on either side, so `https://gitlab.com/`
/// in configuration matches tokens issued by `https://gitlab.com`.
#[must_use]
pub fn issuers_match(claimed: &str, expected: &str) -> bool {
    normalize_issuer(claimed) == normalize_issuer(expected)
}

fn normalize_issuer(issuer: &str) -> &str {
    issuer.strip_suffix('/').unwrap_or(issuer)
}

/// Decode an Ed25519 public key from JWK `x` field (base64url format).
///
/// The `x` field in an OKP (Octet Key Pair) JWK contains the public key
/// in base64url encoding without padding.
///
/// # Errors
///
/// Returns `base64::DecodeError` if the base64url content cannot be decoded.
pub fn decode_ed25519_public_key_jwk(x_b64url: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(x_b64url)
}

// =============================================================================
// Tests
// =============================================================================
