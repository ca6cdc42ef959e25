//! Data models for the unpack gateway.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Liveness message returned by `GET /`.
pub const ROOT_MESSAGE: &str = "PSI Image Unpacker";

/// CI provider a sync request is relayed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// GitLab pipeline trigger API.
    Gitlab,
    /// GitHub workflow-dispatch API.
    Github,
}

impl Provider {
    /// Path segment and metric label for this provider.
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gitlab => "gitlab",
            Provider::Github => "github",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential scheme accepted by a sync route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthScheme {
    /// Provider-issued JWT verified against the provider's JWKS.
    Jwt,
    /// Static shared secret compared for equality.
    Secret,
}

impl AuthScheme {
    /// Path segment and metric label for this scheme.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::Jwt => "jwt",
            AuthScheme::Secret => "secret",
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Response body for `GET /`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
}

/// Query parameters accepted by the sync routes.
///
/// `image` is optional at the extractor level so that credential checks run
/// (and fail with 401/403) before the missing parameter is reported.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncParams {
    /// Image reference forwarded to the pipeline.
    pub image: Option<String>,
}

/// Response body for a successfully triggered pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Always "triggered".
    pub status: String,

    /// Provider whose pipeline was started.
    pub provider: Provider,

    /// Image reference passed to the pipeline.
    pub image: String,
}

/// Identity of a caller that passed authentication.
///
/// Inserted into request extensions by the auth middleware.
#[derive(Debug, Clone)]
pub struct AuthenticatedCaller {
    /// Scheme the caller authenticated with.
    pub scheme: AuthScheme,

    /// Project or repository named in the token; `None` for shared-secret callers.
    pub origin: Option<String>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Provider::Gitlab).unwrap(),
            "\"gitlab\""
        );
        assert_eq!(
            serde_json::to_string(&Provider::Github).unwrap(),
            "\"github\""
        );
    }

    #[test]
    fn test_display_matches_path_segments() {
        assert_eq!(Provider::Gitlab.to_string(), "gitlab");
        assert_eq!(AuthScheme::Jwt.to_string(), "jwt");
        assert_eq!(AuthScheme::Secret.to_string(), "secret");
    }

    #[test]
    fn test_sync_params_image_optional() {
        let params: SyncParams = serde_json::from_str("{}").unwrap();
        assert!(params.image.is_none());
    }

    #[test]
    fn test_sync_response_serialization() {
        let response = SyncResponse {
            status: "triggered".to_string(),
            provider: Provider::Github,
            image: "registry.example.com/app:1.2.3".to_string(),
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "triggered");
        assert_eq!(json["provider"], "github");
        assert_eq!(json["image"], "registry.example.com/app:1.2.3");
    }
}
