//! Deterministic cryptographic fixtures for testing
//!
//! Provides reproducible signing keys and their JWKS entries:
//! - Ed25519 keypairs derived from a one-byte seed
//! - A fixed 2048-bit RSA key (GitLab and GitHub sign job tokens with RS256)

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use ring::signature::{Ed25519KeyPair, KeyPair};
use serde::Serialize;
use thiserror::Error;

/// Test fixture error type
#[derive(Error, Debug)]
pub enum FixtureError {
    #[error("Cryptographic operation failed: {0}")]
    Crypto(String),
}

/// PKCS#1 PEM of the RSA test key.
pub const RSA_TEST_KEY_PEM: &str = include_str!("../fixtures/rsa_test_key.pem");

/// Base64url modulus of the RSA test key.
pub const RSA_TEST_KEY_N: &str = "uW-a07qumPPvuo259S1VSIg5hROEWBYo_fdSdX3BI5hGbudyu6tQfttgjk7iWjpgYOgj-sDNm_TC8wUlXz5IQ0uARkiAA34N6Jr-37CnqeTSQR3dHuXG43Hnaq16WaKP9d9nSImuhSI3uHbdQ6q2GaU1QM-znFzbSTUCfVJ9fzaPzWu11Bumpgg7uGiB70PieJUxe4jEBdhCdVprOxAU7UU7V1AlQuBiq8U-zIGEsQn8v3G_ELYYr9adn4c0J0qllFi3Rcxt4hTO5kb_ZUkvM3eimv6LmIpbuRBgcBCrBlaM0gw6nlZF0FnAKNyyybvqD27VVa6pQQDHX_a_cKFIuQ";

/// Base64url public exponent of the RSA test key (65537).
pub const RSA_TEST_KEY_E: &str = "AQAB";

/// A key that can sign test tokens and describe itself as a JWK.
pub trait TestSigningKey {
    /// Key ID placed in the token header and the JWK.
    fn kid(&self) -> &str;

    /// JWKS entry for the public half of this key.
    fn jwk_json(&self) -> serde_json::Value;

    /// Sign `claims` with this key, setting `kid` in the header.
    fn sign<T: Serialize>(&self, claims: &T) -> String;
}

/// Deterministic Ed25519 keypair.
pub struct TestKeypair {
    kid: String,
    public_key_bytes: Vec<u8>,
    private_key_pkcs8: Vec<u8>,
}

impl TestKeypair {
    /// Create a keypair from a seed. The same seed always produces the same key.
    pub fn new(seed: u8, kid: &str) -> Result<Self, FixtureError> {
        let mut seed_bytes = [0u8; 32];
        seed_bytes[0] = seed;
        for (i, byte) in seed_bytes.iter_mut().enumerate().skip(1) {
            *byte = seed.wrapping_mul(i as u8).wrapping_add(i as u8);
        }

        let key_pair = Ed25519KeyPair::from_seed_unchecked(&seed_bytes).map_err(|e| {
            FixtureError::Crypto(format!("Failed to generate test keypair: {:?}", e))
        })?;

        Ok(Self {
            kid: kid.to_string(),
            public_key_bytes: key_pair.public_key().as_ref().to_vec(),
            private_key_pkcs8: build_pkcs8_from_seed(&seed_bytes),
        })
    }

    pub fn public_key_bytes(&self) -> &[u8] {
        &self.public_key_bytes
    }
}

impl TestSigningKey for TestKeypair {
    fn kid(&self) -> &str {
        &self.kid
    }

    fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "OKP",
            "kid": self.kid,
            "crv": "Ed25519",
            "x": URL_SAFE_NO_PAD.encode(&self.public_key_bytes),
            "alg": "EdDSA",
            "use": "sig"
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> String {
        let encoding_key = EncodingKey::from_ed_der(&self.private_key_pkcs8);
        let mut header = Header::new(Algorithm::EdDSA);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &encoding_key).expect("Failed to sign token")
    }
}

/// The fixed RSA test key, published under a caller-chosen `kid`.
pub struct RsaTestKey {
    kid: String,
    encoding_key: EncodingKey,
}

impl RsaTestKey {
    pub fn new(kid: &str) -> Result<Self, FixtureError> {
        let encoding_key = EncodingKey::from_rsa_pem(RSA_TEST_KEY_PEM.as_bytes())
            .map_err(|e| FixtureError::Crypto(format!("Failed to load RSA test key: {}", e)))?;

        Ok(Self {
            kid: kid.to_string(),
            encoding_key,
        })
    }
}

impl TestSigningKey for RsaTestKey {
    fn kid(&self) -> &str {
        &self.kid
    }

    fn jwk_json(&self) -> serde_json::Value {
        serde_json::json!({
            "kty": "RSA",
            "kid": self.kid,
            "n": RSA_TEST_KEY_N,
            "e": RSA_TEST_KEY_E,
            "alg": "RS256",
            "use": "sig"
        })
    }

    fn sign<T: Serialize>(&self, claims: &T) -> String {
        let mut header = Header::new(Algorithm::RS256);
        header.typ = Some("JWT".to_string());
        header.kid = Some(self.kid.clone());

        encode(&header, claims, &self.encoding_key).expect("Failed to sign token")
    }
}

/// Build PKCS#8 v1 document from Ed25519 seed
///
/// This is a test-only utility. Production code must use ring::rand::SystemRandom.
fn build_pkcs8_from_seed(seed: &[u8; 32]) -> Vec<u8> {
    // PKCS#8 v1 (RFC 5208) for Ed25519:
    // SEQUENCE { INTEGER 0, SEQUENCE { OID 1.3.101.112 }, OCTET STRING { OCTET STRING seed } }
    let mut pkcs8 = Vec::with_capacity(48);
    pkcs8.extend_from_slice(&[0x30, 0x2e]);
    pkcs8.extend_from_slice(&[0x02, 0x01, 0x00]);
    pkcs8.extend_from_slice(&[0x30, 0x05, 0x06, 0x03, 0x2b, 0x65, 0x70]);
    pkcs8.extend_from_slice(&[0x04, 0x22, 0x04, 0x20]);
    pkcs8.extend_from_slice(seed);
    pkcs8
}
