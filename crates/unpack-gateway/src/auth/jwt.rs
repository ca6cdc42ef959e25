//! JWT validation for CI job tokens.
//!
//! Validates bearer tokens against the key set fetched from the provider's
//! JWKS endpoint at startup.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The header `alg` must match the key type; HMAC algorithms never match a JWK
//! - Expiration and issued-at claims are validated with clock skew tolerance
//! - The issuer is checked only after the signature verifies

use crate::auth::claims::ProviderClaims;
use crate::auth::jwks::{Jwk, KeySet};
use crate::errors::{GatewayError, TokenRejection};
use crate::models::Provider;
use common::jwt::{check_token_size, decode_ed25519_public_key_jwk, issuers_match, validate_iat};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Header, Validation};
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// JWT validator for one provider.
pub struct JwtValidator {
    provider: Provider,

    /// Keys fetched from the provider's JWKS at startup.
    key_set: Arc<KeySet>,

    /// Expected `iss` claim.
    expected_issuer: String,

    /// Expected `aud` claim, if audience checking is enabled.
    audience: Option<String>,

    /// Clock skew tolerance in seconds for exp and iat validation.
    clock_skew_seconds: i64,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `provider` - Provider the tokens come from (for logging)
    /// * `key_set` - Keys fetched from the provider's JWKS
    /// * `expected_issuer` - Required value of the `iss` claim
    /// * `audience` - Required value of the `aud` claim, or `None` to skip the check
    /// * `clock_skew_seconds` - Clock skew tolerance for exp and iat validation
    pub fn new(
        provider: Provider,
        key_set: Arc<KeySet>,
        expected_issuer: String,
        audience: Option<String>,
        clock_skew_seconds: i64,
    ) -> Self {
        Self {
            provider,
            key_set,
            expected_issuer,
            audience,
            clock_skew_seconds,
        }
    }

    /// Validate a JWT and return the claims.
    ///
    /// # Security Checks
    ///
    /// 1. Size check - reject tokens > 8KB before parsing
    /// 2. Decode the header for `alg` and `kid`
    /// 3. Verify the signature against each candidate key
    /// 4. Validate exp (and aud when configured)
    /// 5. Validate iat with clock skew tolerance
    /// 6. Compare iss with the expected issuer
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::InvalidToken` with the rejection reason, or
    /// `GatewayError::InvalidIssuer` for a validly signed token from another issuer.
    #[instrument(skip_all, fields(provider = %self.provider))]
    pub fn validate(&self, token: &str) -> Result<ProviderClaims, GatewayError> {
        check_token_size(token).map_err(|e| {
            tracing::debug!(target: "ug.auth.jwt", error = %e, "Token size check failed");
            GatewayError::InvalidToken(TokenRejection::Decode)
        })?;

        let header = decode_header(token).map_err(|e| {
            tracing::debug!(target: "ug.auth.jwt", error = %e, "Token header decode failed");
            GatewayError::InvalidToken(TokenRejection::Decode)
        })?;

        let claims = self.verify_with_key_set(token, &header)?;

        if let Some(iat) = claims.iat {
            if let Err(e) = validate_iat(iat, self.clock_skew()) {
                tracing::debug!(target: "ug.auth.jwt", error = %e, "Token iat validation failed");
                return Err(GatewayError::InvalidToken(TokenRejection::Decode));
            }
        }

        if !issuers_match(&claims.iss, &self.expected_issuer) {
            tracing::warn!(
                target: "ug.auth.jwt",
                iss = %claims.iss,
                expected = %self.expected_issuer,
                "Token issuer mismatch"
            );
            return Err(GatewayError::InvalidIssuer(claims.iss));
        }

        tracing::debug!(
            target: "ug.auth.jwt",
            origin = ?claims.origin(),
            "Token validated successfully"
        );
        Ok(claims)
    }

    fn clock_skew(&self) -> Duration {
        Duration::from_secs(u64::try_from(self.clock_skew_seconds).unwrap_or(0))
    }

    fn validation(&self, alg: Algorithm) -> Validation {
        let mut validation = Validation::new(alg);
        validation.leeway = self.clock_skew().as_secs();
        validation.validate_exp = true;
        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.set_required_spec_claims(&["exp", "aud"]);
            }
            None => validation.validate_aud = false,
        }
        validation
    }

    /// Try each candidate key until one verifies the signature.
    ///
    /// Claim failures (expiry, audience, payload shape) are only reported once
    /// a key has verified the signature; until then every key is tried.
    fn verify_with_key_set(
        &self,
        token: &str,
        header: &Header,
    ) -> Result<ProviderClaims, GatewayError> {
        let validation = self.validation(header.alg);
        let mut tried = 0usize;

        for jwk in self.key_set.candidates(header.kid.as_deref()) {
            let Some(decoding_key) = decoding_key_for(jwk, header.alg) else {
                continue;
            };
            tried += 1;

            match decode::<ProviderClaims>(token, &decoding_key, &validation) {
                Ok(token_data) => return Ok(token_data.claims),
                Err(e) => match rejection_for(e.kind()) {
                    Some(rejection) => {
                        tracing::debug!(target: "ug.auth.jwt", error = %e, "Token rejected");
                        return Err(GatewayError::InvalidToken(rejection));
                    }
                    None => {
                        tracing::trace!(target: "ug.auth.jwt", kid = ?jwk.kid, error = %e, "Key did not verify token");
                    }
                },
            }
        }

        tracing::debug!(
            target: "ug.auth.jwt",
            kid = ?header.kid,
            alg = ?header.alg,
            keys_tried = tried,
            "No key verified token signature"
        );
        Err(GatewayError::InvalidToken(TokenRejection::BadSignature))
    }
}

/// Map a decode failure to a final rejection.
///
/// Returns `None` when the failure is specific to the key that was tried, so
/// the next candidate key should be attempted.
fn rejection_for(kind: &ErrorKind) -> Option<TokenRejection> {
    match kind {
        ErrorKind::InvalidSignature
        | ErrorKind::InvalidAlgorithm
        | ErrorKind::InvalidRsaKey(_)
        | ErrorKind::InvalidEcdsaKey
        | ErrorKind::InvalidKeyFormat => None,
        ErrorKind::ExpiredSignature => Some(TokenRejection::Expired),
        ErrorKind::InvalidAudience => Some(TokenRejection::InvalidAudience),
        ErrorKind::MissingRequiredClaim(claim) if claim == "aud" => {
            Some(TokenRejection::InvalidAudience)
        }
        _ => Some(TokenRejection::Decode),
    }
}

/// Build a decoding key from a JWK if the key can verify `alg`.
fn decoding_key_for(jwk: &Jwk, alg: Algorithm) -> Option<DecodingKey> {
    if let Some(jwk_alg) = &jwk.alg {
        if jwk_alg.parse::<Algorithm>().ok() != Some(alg) {
            return None;
        }
    }

    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => {
            if jwk.kty != "RSA" {
                return None;
            }
            let (n, e) = (jwk.n.as_deref()?, jwk.e.as_deref()?);
            DecodingKey::from_rsa_components(n, e)
                .map_err(|e| {
                    tracing::warn!(target: "ug.auth.jwt", kid = ?jwk.kid, error = %e, "Invalid RSA JWK");
                })
                .ok()
        }
        Algorithm::ES256 | Algorithm::ES384 => {
            let curve = if alg == Algorithm::ES256 { "P-256" } else { "P-384" };
            if jwk.kty != "EC" || jwk.crv.as_deref() != Some(curve) {
                return None;
            }
            let (x, y) = (jwk.x.as_deref()?, jwk.y.as_deref()?);
            DecodingKey::from_ec_components(x, y)
                .map_err(|e| {
                    tracing::warn!(target: "ug.auth.jwt", kid = ?jwk.kid, error = %e, "Invalid EC JWK");
                })
                .ok()
        }
        Algorithm::EdDSA => {
            if jwk.kty != "OKP" || jwk.crv.as_deref().is_some_and(|crv| crv != "Ed25519") {
                return None;
            }
            let public_key_bytes = decode_ed25519_public_key_jwk(jwk.x.as_deref()?)
                .map_err(|e| {
                    tracing::warn!(target: "ug.auth.jwt", kid = ?jwk.kid, error = %e, "Invalid public key encoding");
                })
                .ok()?;
            Some(DecodingKey::from_ed_der(&public_key_bytes))
        }
        // Symmetric algorithms cannot be verified with a published key.
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => None,
    }
}
