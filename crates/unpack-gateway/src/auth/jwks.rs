//! JWKS client for fetching a provider's public signing keys.
//!
//! Keys are fetched once at startup for every enabled provider and held in an
//! immutable [`KeySet`] for the lifetime of the process. There is no refresh:
//! a provider key rotation requires a restart.

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::instrument;

/// JSON Web Key from a JWKS endpoint.
///
/// Covers the members used by RSA (`n`, `e`), EC (`crv`, `x`, `y`) and
/// OKP/Ed25519 (`crv`, `x`) keys. GitLab and GitHub publish RSA keys.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type ("RSA", "EC" or "OKP").
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is intended for (e.g. "RS256").
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use ("sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC and OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate or OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<Jwk>,
}

/// Immutable set of signature-verification keys for one provider.
#[derive(Debug, Clone, Default)]
pub struct KeySet {
    keys: Vec<Jwk>,
}

impl KeySet {
    /// Build a key set, dropping keys published for encryption.
    pub fn new(keys: Vec<Jwk>) -> Self {
        let keys = keys
            .into_iter()
            .filter(|key| key.key_use.as_deref().map_or(true, |u| u == "sig"))
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys that may have signed a token with the given header `kid`.
    ///
    /// With a `kid`, only keys carrying that exact ID. Without one, every key.
    pub fn candidates<'a>(&'a self, kid: Option<&'a str>) -> impl Iterator<Item = &'a Jwk> + 'a {
        self.keys
            .iter()
            .filter(move |key| kid.map_or(true, |kid| key.kid.as_deref() == Some(kid)))
    }
}

#[derive(Debug, Error)]
pub enum JwksError {
    #[error("JWKS request failed: {0}")]
    Request(String),

    #[error("JWKS endpoint returned status {0}")]
    Status(u16),

    #[error("JWKS response could not be parsed: {0}")]
    Parse(String),

    #[error("JWKS contains no signing keys")]
    Empty,
}

/// Fetches a provider's JWKS.
pub struct JwksClient {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl JwksClient {
    /// Create a new JWKS client.
    ///
    /// # Arguments
    ///
    /// * `jwks_url` - URL to the provider's JWKS endpoint
    /// * `timeout` - Request timeout
    pub fn new(jwks_url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "ug.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }


    /// Fetch the key set.
    ///
    /// # Errors
    ///
    /// Returns `JwksError` if the endpoint is unreachable, answers with a
    /// non-success status, returns an unparseable document, or publishes no
    /// signing keys.
    #[instrument(skip(self), fields(url = %self.jwks_url))]
    pub async fn fetch(&self) -> Result<KeySet, JwksError> {
        tracing::debug!(target: "ug.auth.jwks", "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "ug.auth.jwks", error = %e, "Failed to fetch JWKS");
                JwksError::Request(e.to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "ug.auth.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(JwksError::Status(response.status().as_u16()));
        }

        let jwks: JwksResponse = response.json().await.map_err(|e| {
            tracing::error!(target: "ug.auth.jwks", error = %e, "Failed to parse JWKS response");
            JwksError::Parse(e.to_string())
        })?;

        let key_set = KeySet::new(jwks.keys);
        if key_set.is_empty() {
            tracing::error!(target: "ug.auth.jwks", "JWKS contains no signing keys");
            return Err(JwksError::Empty);
        }

        tracing::info!(
            target: "ug.auth.jwks",
            key_count = key_set.len(),
            "JWKS loaded"
        );

        Ok(key_set)
    }
}
