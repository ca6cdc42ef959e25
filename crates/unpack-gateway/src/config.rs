//! Gateway configuration.
//!
//! Configuration is loaded from environment variables. Each CI provider is an
//! optional credential group: the group is present only when every one of its
//! required variables is set to a non-empty value. Tokens and the shared
//! secret are held as `SecretString`, so the derived `Debug` output is safe to
//! log.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use std::collections::HashMap;
use std::env;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";

/// Default git ref pipelines are started on.
pub const DEFAULT_GIT_REF: &str = "main";

/// Default GitHub REST API base URL.
pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Issuer of GitHub Actions OIDC tokens.
pub const DEFAULT_GITHUB_OIDC_ISSUER: &str = "https://token.actions.githubusercontent.com";

/// Default timeout for outbound trigger calls in seconds.
pub const DEFAULT_TRIGGER_TIMEOUT_SECONDS: u64 = 10;

/// Timeout applied to every inbound request by the router.
pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Upper bound for `TRIGGER_TIMEOUT_SECONDS`.
///
/// Keeps the outbound call inside [`REQUEST_TIMEOUT_SECONDS`] so the caller
/// sees the provider's answer instead of a 408 for a pipeline that started.
pub const MAX_TRIGGER_TIMEOUT_SECONDS: u64 = REQUEST_TIMEOUT_SECONDS - 5;

/// Default graceful-shutdown drain period in seconds.
pub const DEFAULT_DRAIN_SECONDS: u64 = 5;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// GitLab credential group.
///
/// Required: `GITLAB_SERVER`, `GITLAB_TARGET_REPOSITORY_ID`, `GITLAB_TOKEN`.
#[derive(Debug, Clone)]
pub struct GitLabConfig {
    /// GitLab instance URL. Also the expected `iss` of GitLab CI job tokens.
    pub server: String,

    /// Numeric ID (or URL-encoded path) of the project whose pipeline is triggered.
    pub project_id: String,

    /// Pipeline trigger token.
    pub trigger_token: SecretString,

    /// Git ref the pipeline runs on.
    pub git_ref: String,

    /// JWKS endpoint for GitLab-issued tokens.
    pub jwks_url: String,

    /// Expected `aud` claim; audience is not checked when unset.
    pub jwt_audience: Option<String>,
}

impl GitLabConfig {
    /// Expected issuer of GitLab CI job tokens.
    pub fn issuer(&self) -> &str {
        &self.server
    }
}

/// GitHub credential group.
///
/// Required: `GITHUB_REPO`, `GITHUB_TOKEN`, `GITHUB_WORKFLOW`.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// Repository in `owner/name` form.
    pub repo: String,

    /// Access token with `actions:write` on the repository.
    pub token: SecretString,

    /// Workflow file name or numeric workflow ID.
    pub workflow: String,

    /// Git ref the workflow runs on.
    pub git_ref: String,

    /// REST API base URL.
    pub api_url: String,

    /// Expected `iss` of GitHub Actions OIDC tokens.
    pub oidc_issuer: String,

    /// JWKS endpoint for GitHub Actions OIDC tokens.
    pub jwks_url: String,

    /// Expected `aud` claim; audience is not checked when unset.
    pub jwt_audience: Option<String>,
}

/// Gateway configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8000").
    pub bind_address: String,

    /// GitLab group, if fully configured.
    pub gitlab: Option<GitLabConfig>,

    /// GitHub group, if fully configured.
    pub github: Option<GitHubConfig>,

    /// Shared secret accepted on `/sync/secret` routes (`SECRET_TOKEN`).
    pub shared_secret: Option<SecretString>,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: i64,

    /// Timeout for JWKS fetches and pipeline trigger calls.
    pub trigger_timeout_seconds: u64,

    /// Seconds to keep draining connections after a shutdown signal.
    pub drain_seconds: u64,

    /// Log output format.
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid trigger timeout configuration: {0}")]
    InvalidTriggerTimeout(String),

    #[error("Invalid drain period configuration: {0}")]
    InvalidDrainPeriod(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address =
            non_empty(vars, "BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let gitlab = gitlab_from_vars(vars);
        let github = github_from_vars(vars);
        let shared_secret = non_empty(vars, "SECRET_TOKEN").map(SecretString::from);

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a valid integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be positive, got {}",
                    value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let trigger_timeout_seconds = if let Some(value_str) = vars.get("TRIGGER_TIMEOUT_SECONDS")
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidTriggerTimeout(format!(
                    "TRIGGER_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidTriggerTimeout(
                    "TRIGGER_TIMEOUT_SECONDS must be greater than 0".to_string(),
                ));
            }

            if value > MAX_TRIGGER_TIMEOUT_SECONDS {
                return Err(ConfigError::InvalidTriggerTimeout(format!(
                    "TRIGGER_TIMEOUT_SECONDS must not exceed {} seconds, got {}",
                    MAX_TRIGGER_TIMEOUT_SECONDS, value
                )));
            }

            value
        } else {
            DEFAULT_TRIGGER_TIMEOUT_SECONDS
        };

        let drain_seconds = match vars.get("DRAIN_SECONDS") {
            Some(value_str) => value_str.parse().map_err(|e| {
                ConfigError::InvalidDrainPeriod(format!(
                    "DRAIN_SECONDS must be a valid non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?,
            None => DEFAULT_DRAIN_SECONDS,
        };

        let log_format = match non_empty(vars, "LOG_FORMAT") {
            None => LogFormat::Text,
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "text" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidLogFormat(format!(
                        "LOG_FORMAT must be 'text' or 'json', got '{}'",
                        value
                    )))
                }
            },
        };

        Ok(Config {
            bind_address,
            gitlab,
            github,
            shared_secret,
            jwt_clock_skew_seconds,
            trigger_timeout_seconds,
            drain_seconds,
            log_format,
        })
    }
}

/// Returns the variable's value, treating empty strings as unset.
fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key).filter(|v| !v.is_empty()).cloned()
}

fn gitlab_from_vars(vars: &HashMap<String, String>) -> Option<GitLabConfig> {
    let server = non_empty(vars, "GITLAB_SERVER")?;
    let project_id = non_empty(vars, "GITLAB_TARGET_REPOSITORY_ID")?;
    let trigger_token = SecretString::from(non_empty(vars, "GITLAB_TOKEN")?);

    let jwks_url = non_empty(vars, "GITLAB_JWKS_URL").unwrap_or_else(|| {
        format!("{}/oauth/discovery/keys", server.trim_end_matches('/'))
    });

    Some(GitLabConfig {
        git_ref: non_empty(vars, "GITLAB_REF").unwrap_or_else(|| DEFAULT_GIT_REF.to_string()),
        jwt_audience: non_empty(vars, "GITLAB_JWT_AUDIENCE"),
        server,
        project_id,
        trigger_token,
        jwks_url,
    })
}

fn github_from_vars(vars: &HashMap<String, String>) -> Option<GitHubConfig> {
    let repo = non_empty(vars, "GITHUB_REPO")?;
    let token = SecretString::from(non_empty(vars, "GITHUB_TOKEN")?);
    let workflow = non_empty(vars, "GITHUB_WORKFLOW")?;

    let oidc_issuer = non_empty(vars, "GITHUB_OIDC_ISSUER")
        .unwrap_or_else(|| DEFAULT_GITHUB_OIDC_ISSUER.to_string());
    let jwks_url = non_empty(vars, "GITHUB_JWKS_URL")
        .unwrap_or_else(|| format!("{}/.well-known/jwks", oidc_issuer.trim_end_matches('/')));

    Some(GitHubConfig {
        git_ref: non_empty(vars, "GITHUB_REF").unwrap_or_else(|| DEFAULT_GIT_REF.to_string()),
        api_url: non_empty(vars, "GITHUB_API_URL")
            .unwrap_or_else(|| DEFAULT_GITHUB_API_URL.to_string()),
        jwt_audience: non_empty(vars, "GITHUB_JWT_AUDIENCE"),
        repo,
        token,
        workflow,
        oidc_issuer,
        jwks_url,
    })
}
