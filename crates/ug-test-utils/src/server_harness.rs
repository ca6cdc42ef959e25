//! Test server harness for E2E testing
//!
//! Provides `TestGatewayServer`, a real gateway bound to a random port with
//! GitLab and GitHub replaced by wiremock servers. Each mock publishes a JWKS
//! for the fixture keys and records trigger calls.

use crate::crypto_fixtures::{RsaTestKey, TestKeypair, TestSigningKey};
use crate::token_builders::GITHUB_ISSUER;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use unpack_gateway::config::Config;
use unpack_gateway::observability::metrics::init_metrics_recorder;
use unpack_gateway::routes::{self, AppState};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

pub const GITLAB_PROJECT_ID: &str = "42";
pub const GITLAB_TRIGGER_TOKEN: &str = "glptt-test-token";
pub const GITLAB_JWKS_PATH: &str = "/oauth/discovery/keys";
pub const GITLAB_TRIGGER_PATH: &str = "/api/v4/projects/42/trigger/pipeline";
pub const GITLAB_RSA_KID: &str = "gitlab-rsa-1";
pub const GITLAB_ED25519_KID: &str = "gitlab-ed25519-1";

pub const GITHUB_REPO: &str = "acme/images";
pub const GITHUB_WORKFLOW: &str = "unpack.yml";
pub const GITHUB_TOKEN: &str = "ghp_test_token";
pub const GITHUB_JWKS_PATH: &str = "/.well-known/jwks";
pub const GITHUB_DISPATCH_PATH: &str = "/repos/acme/images/actions/workflows/unpack.yml/dispatches";
pub const GITHUB_RSA_KID: &str = "github-rsa-1";

pub const TEST_SHARED_SECRET: &str = "test-shared-secret";

/// Global metrics handle for test servers
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics handle shared by every test server in the process.
///
/// Installs the global recorder on first use; falls back to a detached
/// handle if another recorder is already installed.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Options for [`TestGatewayServer`].
#[derive(Default)]
pub struct TestGatewayServerBuilder {
    gitlab: bool,
    github: bool,
    shared_secret: Option<String>,
    vars: HashMap<String, String>,
}

impl TestGatewayServerBuilder {
    /// Configure the GitLab credential group against the GitLab mock.
    pub fn with_gitlab(mut self) -> Self {
        self.gitlab = true;
        self
    }

    /// Configure the GitHub credential group against the GitHub mock.
    pub fn with_github(mut self) -> Self {
        self.github = true;
        self
    }

    /// Set `SECRET_TOKEN` to [`TEST_SHARED_SECRET`].
    pub fn with_shared_secret(mut self) -> Self {
        self.shared_secret = Some(TEST_SHARED_SECRET.to_string());
        self
    }

    /// Set an arbitrary environment variable (applied last).
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_string(), value.to_string());
        self
    }

    /// Spawn the gateway.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, startup fails (e.g. the
    /// JWKS cannot be fetched), or the listener cannot be bound.
    pub async fn spawn(self) -> Result<TestGatewayServer, anyhow::Error> {
        let gitlab_mock = MockServer::start().await;
        let github_mock = MockServer::start().await;

        let gitlab_key = RsaTestKey::new(GITLAB_RSA_KID)?;
        let gitlab_ed25519_key = TestKeypair::new(1, GITLAB_ED25519_KID)?;
        let github_key = RsaTestKey::new(GITHUB_RSA_KID)?;

        Mock::given(method("GET"))
            .and(path(GITLAB_JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [gitlab_key.jwk_json(), gitlab_ed25519_key.jwk_json()]
            })))
            .mount(&gitlab_mock)
            .await;

        Mock::given(method("GET"))
            .and(path(GITHUB_JWKS_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [github_key.jwk_json()]
            })))
            .mount(&github_mock)
            .await;

        let mut vars = HashMap::from([
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("TRIGGER_TIMEOUT_SECONDS".to_string(), "5".to_string()),
        ]);
        if self.gitlab {
            vars.extend([
                ("GITLAB_SERVER".to_string(), gitlab_mock.uri()),
                (
                    "GITLAB_TARGET_REPOSITORY_ID".to_string(),
                    GITLAB_PROJECT_ID.to_string(),
                ),
                ("GITLAB_TOKEN".to_string(), GITLAB_TRIGGER_TOKEN.to_string()),
                // Explicit so that overriding GITLAB_SERVER keeps the mock's keys
                (
                    "GITLAB_JWKS_URL".to_string(),
                    format!("{}{}", gitlab_mock.uri(), GITLAB_JWKS_PATH),
                ),
            ]);
        }
        if self.github {
            vars.extend([
                ("GITHUB_REPO".to_string(), GITHUB_REPO.to_string()),
                ("GITHUB_TOKEN".to_string(), GITHUB_TOKEN.to_string()),
                ("GITHUB_WORKFLOW".to_string(), GITHUB_WORKFLOW.to_string()),
                ("GITHUB_API_URL".to_string(), github_mock.uri()),
                (
                    "GITHUB_JWKS_URL".to_string(),
                    format!("{}{}", github_mock.uri(), GITHUB_JWKS_PATH),
                ),
            ]);
        }
        if let Some(secret) = self.shared_secret {
            vars.insert("SECRET_TOKEN".to_string(), secret);
        }
        vars.extend(self.vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = AppState::bootstrap(config.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bootstrap gateway: {}", e))?;

        let app = routes::build_routes(Arc::new(state), test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, make_service).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(TestGatewayServer {
            addr,
            config,
            gitlab_mock,
            github_mock,
            gitlab_key,
            gitlab_ed25519_key,
            github_key,
            _handle: handle,
        })
    }
}

/// Test harness for spawning the gateway in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let server = TestGatewayServer::builder().spawn().await?;
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestGatewayServer {
    addr: SocketAddr,
    config: Config,
    gitlab_mock: MockServer,
    github_mock: MockServer,
    gitlab_key: RsaTestKey,
    gitlab_ed25519_key: TestKeypair,
    github_key: RsaTestKey,
    _handle: JoinHandle<()>,
}

impl TestGatewayServer {
    pub fn builder() -> TestGatewayServerBuilder {
        TestGatewayServerBuilder::default()
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Expected issuer of GitLab tokens (the GitLab mock's URL).
    pub fn gitlab_issuer(&self) -> String {
        self.gitlab_mock.uri()
    }

    /// Expected issuer of GitHub tokens.
    pub fn github_issuer(&self) -> &'static str {
        GITHUB_ISSUER
    }

    /// RSA key published in the GitLab JWKS.
    pub fn gitlab_key(&self) -> &RsaTestKey {
        &self.gitlab_key
    }

    /// Ed25519 key published in the GitLab JWKS.
    pub fn gitlab_ed25519_key(&self) -> &TestKeypair {
        &self.gitlab_ed25519_key
    }

    /// RSA key published in the GitHub JWKS.
    pub fn github_key(&self) -> &RsaTestKey {
        &self.github_key
    }

    pub fn gitlab_mock(&self) -> &MockServer {
        &self.gitlab_mock
    }

    pub fn github_mock(&self) -> &MockServer {
        &self.github_mock
    }

    /// Answer GitLab pipeline triggers with `status` and `body`.
    pub async fn mount_gitlab_trigger(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(GITLAB_TRIGGER_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.gitlab_mock)
            .await;
    }

    /// Answer GitHub workflow dispatches with `status` and `body`.
    pub async fn mount_github_dispatch(&self, status: u16, body: &str) {
        Mock::given(method("POST"))
            .and(path(GITHUB_DISPATCH_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&self.github_mock)
            .await;
    }

    /// Pipeline trigger calls received by the GitLab mock.
    pub async fn gitlab_trigger_requests(&self) -> Vec<Request> {
        requests_to(&self.gitlab_mock, GITLAB_TRIGGER_PATH).await
    }

    /// Workflow dispatch calls received by the GitHub mock.
    pub async fn github_dispatch_requests(&self) -> Vec<Request> {
        requests_to(&self.github_mock, GITHUB_DISPATCH_PATH).await
    }
}

async fn requests_to(mock: &MockServer, request_path: &str) -> Vec<Request> {
    mock.received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|request| request.url.path() == request_path)
        .collect()
}

impl Drop for TestGatewayServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
