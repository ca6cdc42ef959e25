//! Pipeline trigger clients.
//!
//! Each enabled provider gets one [`PipelineTrigger`]. A trigger makes a
//! single outbound call with no retry: 2xx is success, any other status is
//! echoed back to the caller, and transport failures become 502.

pub mod github;
pub mod gitlab;

use crate::errors::GatewayError;
use crate::models::Provider;
use crate::observability::metrics::record_trigger;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use std::time::{Duration, Instant};

pub use github::GitHubDispatch;
pub use gitlab::GitLabTrigger;

/// Starts a CI pipeline for an updated image.
#[async_trait]
pub trait PipelineTrigger: Send + Sync {
    /// Provider this trigger talks to.
    fn provider(&self) -> Provider;

    /// Start the pipeline with `image` as its input.
    ///
    /// # Errors
    ///
    /// - `GatewayError::Upstream` if the provider answers with a non-2xx status
    /// - `GatewayError::UpstreamUnavailable` if the provider cannot be reached
    async fn trigger(&self, image: &str) -> Result<(), GatewayError>;
}

/// Build the shared outbound HTTP client.
///
/// # Errors
///
/// Returns `GatewayError::Internal` if the HTTP client cannot be built.
pub(crate) fn build_http_client(timeout: Duration) -> Result<Client, GatewayError> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .user_agent(concat!("unpack-gateway/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| {
            tracing::error!(target: "ug.services", error = %e, "Failed to build HTTP client");
            GatewayError::Internal
        })
}

/// Send a prepared trigger request and map the response.
pub(crate) async fn send_trigger(
    provider: Provider,
    request: RequestBuilder,
) -> Result<(), GatewayError> {
    let start = Instant::now();

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            record_trigger(provider.as_str(), "unavailable", start.elapsed());
            tracing::warn!(target: "ug.services", provider = %provider, error = %e, "Trigger request failed");
            return Err(GatewayError::UpstreamUnavailable(e.to_string()));
        }
    };

    let status = response.status();
    if status.is_success() {
        record_trigger(provider.as_str(), "success", start.elapsed());
        tracing::info!(target: "ug.services", provider = %provider, status = %status, "Pipeline triggered");
        return Ok(());
    }

    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!(
                target: "ug.services",
                provider = %provider,
                status = %status,
                error = %e,
                "Failed to read provider response body"
            );
            String::new()
        }
    };
    record_trigger(provider.as_str(), "rejected", start.elapsed());
    tracing::warn!(
        target: "ug.services",
        provider = %provider,
        status = %status,
        body = %body,
        "Provider rejected trigger"
    );

    Err(GatewayError::Upstream {
        status: status.as_u16(),
        body,
    })
}
