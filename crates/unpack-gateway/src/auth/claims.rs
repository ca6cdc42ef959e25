//! CI job token claims.
//!
//! GitLab CI job tokens and GitHub Actions OIDC tokens share the registered
//! claims the gateway checks (`iss`, `exp`, `iat`). The provider-specific
//! fields are optional and only used for logging. The `sub` field is redacted
//! in Debug output.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Claims of a validated CI job token.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderClaims {
    /// Issuer; compared against the provider's expected issuer.
    pub iss: String,

    /// Subject (e.g. `project_path:group/app:ref_type:branch:ref:main`) - redacted in Debug output.
    #[serde(default)]
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default)]
    pub iat: Option<i64>,

    /// GitLab: path of the project running the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,

    /// GitHub: `owner/name` of the repository running the workflow.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<String>,

    /// Git ref the job runs on.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub git_ref: Option<String>,
}

impl fmt::Debug for ProviderClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderClaims")
            .field("iss", &self.iss)
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("project_path", &self.project_path)
            .field("repository", &self.repository)
            .field("git_ref", &self.git_ref)
            .finish()
    }
}

impl ProviderClaims {
    /// Project or repository the job belongs to, whichever the provider sets.
    pub fn origin(&self) -> Option<&str> {
        self.project_path
            .as_deref()
            .or(self.repository.as_deref())
    }
}
