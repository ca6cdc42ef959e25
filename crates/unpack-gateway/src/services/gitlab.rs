//! GitLab pipeline trigger client.
//!
//! Uses the pipeline trigger API with a project trigger token:
//!
//! ```text
//! POST {server}/api/v4/projects/{id}/trigger/pipeline
//! token=...&ref=main&variables[IMAGE]=registry.example.com/app:1.2.3
//! ```

use crate::config::GitLabConfig;
use crate::errors::GatewayError;
use crate::models::Provider;
use crate::services::{build_http_client, send_trigger, PipelineTrigger};
use async_trait::async_trait;
use common::secret::{ExposeSecret, SecretString};
use reqwest::Client;
use std::time::Duration;
use tracing::instrument;

/// Pipeline variable that carries the image reference.
pub const IMAGE_VARIABLE: &str = "variables[IMAGE]";

/// Triggers a GitLab pipeline.
pub struct GitLabTrigger {
    client: Client,

    /// Full trigger endpoint URL.
    trigger_url: String,

    trigger_token: SecretString,

    git_ref: String,
}

impl GitLabTrigger {
    /// Create a new GitLab trigger client.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Internal` if the HTTP client cannot be built.
    pub fn new(config: &GitLabConfig, timeout: Duration) -> Result<Self, GatewayError> {
        Ok(Self {
            client: build_http_client(timeout)?,
            trigger_url: trigger_url(&config.server, &config.project_id),
            trigger_token: config.trigger_token.clone(),
            git_ref: config.git_ref.clone(),
        })
    }
}

fn trigger_url(server: &str, project_id: &str) -> String {
    format!(
        "{}/api/v4/projects/{}/trigger/pipeline",
        server.trim_end_matches('/'),
        project_id
    )
}

#[async_trait]
impl PipelineTrigger for GitLabTrigger {
    fn provider(&self) -> Provider {
        Provider::Gitlab
    }

    #[instrument(skip(self), fields(git_ref = %self.git_ref))]
    async fn trigger(&self, image: &str) -> Result<(), GatewayError> {
        let form = [
            ("token", self.trigger_token.expose_secret()),
            ("ref", self.git_ref.as_str()),
            (IMAGE_VARIABLE, image),
        ];

        send_trigger(
            Provider::Gitlab,
            self.client.post(&self.trigger_url).form(&form),
        )
        .await
    }
}
