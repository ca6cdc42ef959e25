//! Static shared-secret verification.
//!
//! The `/sync/secret` routes take the raw `Authorization` header value and
//! compare it, byte for byte, with `SECRET_TOKEN`. The comparison runs in
//! constant time over the configured secret's length.

use common::secret::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Configured shared secret.
#[derive(Debug, Clone)]
pub struct SharedSecret {
    secret: SecretString,
}

impl SharedSecret {
    pub fn new(secret: SecretString) -> Self {
        Self { secret }
    }

    /// Returns true iff `presented` is exactly the configured secret.
    pub fn verify(&self, presented: &str) -> bool {
        let expected = self.secret.expose_secret().as_bytes();
        // ct_eq on slices short-circuits on length only.
        expected.ct_eq(presented.as_bytes()).into()
    }
}
