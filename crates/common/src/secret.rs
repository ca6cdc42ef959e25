//! Secret types for protecting sensitive values from accidental logging.
//!
//! Re-exports types from the [`secrecy`] crate. The gateway holds three kinds
//! of secrets: the GitLab pipeline trigger token, the GitHub access token and
//! the shared secret accepted on the `/sync/secret` routes.
//!
//! `SecretString` implements `Debug` with redaction, so any struct deriving
//! `Debug` that contains one is safe to log via `{:?}` or tracing.
//!
//! # Example
//!
//! ```rust
//! use common::secret::SecretString;
//! use secrecy::ExposeSecret;
//!
//! #[derive(Debug)]
//! struct TriggerCredentials {
//!     project_id: String,
//!     token: SecretString,
//! }
//!
//! let creds = TriggerCredentials {
//!     project_id: "42".to_string(),
//!     token: SecretString::from("glptt-abc"),
//! };
//!
//! // Token is redacted
//! println!("{:?}", creds);
//!
//! // Access requires an explicit call
//! let token: &str = creds.token.expose_secret();
//! ```

pub use secrecy::{ExposeSecret, SecretBox, SecretString};
