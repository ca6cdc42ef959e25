//! Builder patterns for test data construction
//!
//! Provides a fluent API for CI job token claims.

use crate::crypto_fixtures::TestSigningKey;
use chrono::{Duration, Utc};
use serde_json::{json, Map, Value};

/// Issuer of GitHub Actions OIDC tokens.
pub const GITHUB_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Builder for CI job token claims
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::gitlab("https://gitlab.example.com")
///     .expires_in(300)
///     .with_audience("unpack-gateway")
///     .sign(&key);
/// ```
pub struct TestTokenBuilder {
    iss: String,
    sub: String,
    exp: i64,
    iat: Option<i64>,
    aud: Option<Value>,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Claims shaped like a GitLab CI job token from `issuer`.
    pub fn gitlab(issuer: &str) -> Self {
        let mut builder = Self::with_issuer(issuer);
        builder.sub = "project_path:psi/image-builder:ref_type:branch:ref:main".to_string();
        builder
            .with_claim("project_path", json!("psi/image-builder"))
            .with_claim("ref", json!("main"))
            .with_claim("ref_type", json!("branch"))
    }

    /// Claims shaped like a GitHub Actions OIDC token.
    pub fn github() -> Self {
        let mut builder = Self::with_issuer(GITHUB_ISSUER);
        builder.sub = "repo:acme/images:ref:refs/heads/main".to_string();
        builder
            .with_claim("repository", json!("acme/images"))
            .with_claim("ref", json!("refs/heads/main"))
    }

    /// Minimal valid claims from `issuer`, expiring in one hour.
    pub fn with_issuer(issuer: &str) -> Self {
        let now = Utc::now();
        Self {
            iss: issuer.to_string(),
            sub: "test-subject".to_string(),
            exp: (now + Duration::seconds(3600)).timestamp(),
            iat: Some(now.timestamp()),
            aud: None,
            extra: Map::new(),
        }
    }

    /// Override the issuer
    pub fn issuer(mut self, issuer: &str) -> Self {
        self.iss = issuer.to_string();
        self
    }

    /// Set expiration in seconds from now (negative for the past)
    pub fn expires_in(mut self, seconds: i64) -> Self {
        self.exp = (Utc::now() + Duration::seconds(seconds)).timestamp();
        self
    }

    /// Set issued-at in seconds from now (positive for the future)
    pub fn issued_in(mut self, seconds: i64) -> Self {
        self.iat = Some((Utc::now() + Duration::seconds(seconds)).timestamp());
        self
    }

    /// Omit the `iat` claim
    pub fn without_iat(mut self) -> Self {
        self.iat = None;
        self
    }

    /// Set a single-valued `aud` claim
    pub fn with_audience(mut self, audience: &str) -> Self {
        self.aud = Some(json!(audience));
        self
    }

    /// Add or replace an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.extra.insert(name.to_string(), value);
        self
    }

    /// Build the claims object
    pub fn build(self) -> Value {
        let mut claims = self.extra;
        claims.insert("iss".to_string(), json!(self.iss));
        claims.insert("sub".to_string(), json!(self.sub));
        claims.insert("exp".to_string(), json!(self.exp));
        if let Some(iat) = self.iat {
            claims.insert("iat".to_string(), json!(iat));
        }
        if let Some(aud) = self.aud {
            claims.insert("aud".to_string(), aud);
        }
        Value::Object(claims)
    }

    /// Build the claims and sign them with `key`
    pub fn sign(self, key: &impl TestSigningKey) -> String {
        key.sign(&self.build())
    }
}
