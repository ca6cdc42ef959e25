//! GitHub workflow-dispatch client.
//!
//! ```text
//! POST {api}/repos/{owner}/{repo}/actions/workflows/{workflow}/dispatches
//! {"ref": "main", "inputs": {"image": "registry.example.com/app:1.2.3"}}
//! ```
//!
//! GitHub answers a successful dispatch with 204 No Content.

use crate::config::GitHubConfig;
use crate::errors::GatewayError;
use crate::models::Provider;
use crate::services::{build_http_client, send_trigger, PipelineTrigger};
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::instrument;

/// REST API version pinned on every request.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Workflow input that carries the image reference.
pub const IMAGE_INPUT: &str = "image";

#[derive(Debug, Serialize)]
struct DispatchRequest<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: BTreeMap<&'a str, &'a str>,
}

/// Dispatches a GitHub Actions workflow.
pub struct GitHubDispatch {
    client: Client,

    /// Full dispatch endpoint URL.
    dispatch_url: String,

    token: SecretString,

    git_ref: String,
}

impl GitHubDispatch {
    /// Create a new GitHub dispatch client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &GitHubConfig, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            dispatch_url: dispatch_url(&config.api_url, &config.repo, &config.workflow),
            token: config.token.clone(),
            git_ref: config.git_ref.clone(),
        })
    }
}

fn dispatch_url(api_url: &str, repo: &str, workflow: &str) -> String {
    format!(
        "{}/repos/{}/actions/workflows/{}/dispatches",
        api_url.trim_end_matches('/'),
        repo,
        workflow
    )
}

#[async_trait]
impl PipelineTrigger for GitHubDispatch {
    fn provider(&self) -> Provider {
        Provider::Github
    }

    #[instrument(skip(self), fields(git_ref = %self.git_ref))]
    async fn trigger(&self, image: &str) -> Result<(), GatewayError> {
        let body = DispatchRequest {
            git_ref: &self.git_ref,
            inputs: BTreeMap::from([(IMAGE_INPUT, image)]),
        };

        let request = self
            .client
            .post(&self.dispatch_url)
            .header("Accept", "application/vnd.github+json")
            .header(
                "Authorization",
                format!("Bearer {}", self.token.expose_secret()),
            )
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .json(&body);

        send_trigger(Provider::Github, request).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_url: &str) -> GitHubConfig {
        GitHubConfig {
            repo: "acme/images".to_string(),
            token: SecretString::from("ghp_test".to_string()),
            workflow: "unpack.yml".to_string(),
            git_ref: "main".to_string(),
            api_url: api_url.to_string(),
            oidc_issuer: "https://token.actions.githubusercontent.com".to_string(),
            jwks_url: "https://token.actions.githubusercontent.com/.well-known/jwks".to_string(),
            jwt_audience: None,
        }
    }

    #[test]
    fn test_dispatch_url() {
        assert_eq!(
            dispatch_url("https://api.github.com/", "acme/images", "unpack.yml"),
            "https://api.github.com/repos/acme/images/actions/workflows/unpack.yml/dispatches"
        );
    }

    #[test]
    fn test_dispatch_body_shape() {
        let body = DispatchRequest {
            git_ref: "main",
            inputs: BTreeMap::from([(IMAGE_INPUT, "app:1")]),
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"ref": "main", "inputs": {"image": "app:1"}})
        );
    }

    #[tokio::test]
    async fn test_dispatch_sends_headers_and_body() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(
                "/repos/acme/images/actions/workflows/unpack.yml/dispatches",
            ))
            .and(header("Authorization", "Bearer ghp_test"))
            .and(header("Accept", "application/vnd.github+json"))
            .and(header("X-GitHub-Api-Version", GITHUB_API_VERSION))
            .and(header_exists("User-Agent"))
            .and(body_json(serde_json::json!({
                "ref": "main",
                "inputs": {"image": "registry.example.com/app:1.2.3"}
            })))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&mock_server)
            .await;

        let dispatch =
            GitHubDispatch::new(&config(&mock_server.uri()), Duration::from_secs(5)).unwrap();

        dispatch
            .trigger("registry.example.com/app:1.2.3")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_dispatch_echoes_rejection() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_string(
                "{\"message\":\"Unexpected inputs provided: [\\\"image\\\"]\"}",
            ))
            .mount(&mock_server)
            .await;

        let dispatch =
            GitHubDispatch::new(&config(&mock_server.uri()), Duration::from_secs(5)).unwrap();

        match dispatch.trigger("app:1").await {
            Err(GatewayError::Upstream { status, body }) => {
                assert_eq!(status, 422);
                assert!(body.contains("Unexpected inputs"));
            }
            other => panic!("expected Upstream error, got {:?}", other),
        }
    }
}
