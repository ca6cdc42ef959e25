//! HTTP routes for the unpack gateway.
//!
//! Defines the application state, its startup bootstrap, and the Axum router.

use crate::auth::jwks::{JwksClient, JwksError, KeySet};
use crate::auth::jwt::JwtValidator;
use crate::auth::secret::SharedSecret;
use crate::capabilities::Capabilities;
use crate::config::{Config, REQUEST_TIMEOUT_SECONDS};
use crate::errors::GatewayError;
use crate::handlers::{self, SyncState};
use crate::middleware::{
    http_metrics_middleware, require_jwt, require_shared_secret, JwtAuthState, SecretAuthState,
};
use crate::models::{AuthScheme, Provider};
use crate::observability::metrics::record_jwks_fetch;
use crate::services::{GitHubDispatch, GitLabTrigger, PipelineTrigger};
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Everything one enabled provider needs at request time.
#[derive(Clone)]
pub struct ProviderState {
    /// Validator over the provider's key set, fetched at startup.
    pub jwt_validator: Arc<JwtValidator>,

    /// Pipeline trigger for the provider.
    pub trigger: Arc<dyn PipelineTrigger>,
}

/// Application state shared across all handlers.
///
/// Built once at startup and immutable afterwards.
#[derive(Clone)]
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Which sync routes are registered.
    pub capabilities: Capabilities,

    pub gitlab: Option<ProviderState>,

    pub github: Option<ProviderState>,

    pub shared_secret: Option<SharedSecret>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to load {provider} signing keys from {url}: {source}")]
    Jwks {
        provider: Provider,
        url: String,
        #[source]
        source: JwksError,
    },

    #[error("Failed to build {0} pipeline trigger: {1}")]
    Trigger(Provider, GatewayError),
}

impl AppState {
    /// Build the application state, fetching signing keys for every enabled provider.
    ///
    /// # Errors
    ///
    /// Returns `StartupError` if a provider's JWKS cannot be fetched or its
    /// trigger client cannot be built.
    pub async fn bootstrap(config: Config) -> Result<Self, StartupError> {
        let timeout = Duration::from_secs(config.trigger_timeout_seconds);

        let gitlab = match &config.gitlab {
            Some(gitlab) => {
                let key_set = fetch_key_set(Provider::Gitlab, &gitlab.jwks_url, timeout).await?;
                let trigger = GitLabTrigger::new(gitlab, timeout)
                    .map_err(|e| StartupError::Trigger(Provider::Gitlab, e))?;
                Some(ProviderState {
                    jwt_validator: Arc::new(JwtValidator::new(
                        Provider::Gitlab,
                        key_set,
                        gitlab.issuer().to_string(),
                        gitlab.jwt_audience.clone(),
                        config.jwt_clock_skew_seconds,
                    )),
                    trigger: Arc::new(trigger),
                })
            }
            None => None,
        };

        let github = match &config.github {
            Some(github) => {
                let key_set = fetch_key_set(Provider::Github, &github.jwks_url, timeout).await?;
                let trigger = GitHubDispatch::new(github, timeout)
                    .map_err(|e| StartupError::Trigger(Provider::Github, e))?;
                Some(ProviderState {
                    jwt_validator: Arc::new(JwtValidator::new(
                        Provider::Github,
                        key_set,
                        github.oidc_issuer.clone(),
                        github.jwt_audience.clone(),
                        config.jwt_clock_skew_seconds,
                    )),
                    trigger: Arc::new(trigger),
                })
            }
            None => None,
        };

        Ok(Self::from_parts(config, gitlab, github))
    }

    /// Assemble state from already-built provider parts.
    pub fn from_parts(
        config: Config,
        gitlab: Option<ProviderState>,
        github: Option<ProviderState>,
    ) -> Self {
        let shared_secret = config.shared_secret.clone().map(SharedSecret::new);
        let capabilities = Capabilities {
            gitlab: gitlab.is_some(),
            github: github.is_some(),
            shared_secret: shared_secret.is_some(),
        };

        Self {
            config,
            capabilities,
            gitlab,
            github,
            shared_secret,
        }
    }

    pub fn provider(&self, provider: Provider) -> Option<&ProviderState> {
        match provider {
            Provider::Gitlab => self.gitlab.as_ref(),
            Provider::Github => self.github.as_ref(),
        }
    }
}

async fn fetch_key_set(
    provider: Provider,
    jwks_url: &str,
    timeout: Duration,
) -> Result<Arc<KeySet>, StartupError> {
    let client = JwksClient::new(jwks_url.to_string(), timeout);
    match client.fetch().await {
        Ok(key_set) => {
            record_jwks_fetch(provider.as_str(), "success");
            tracing::info!(target: "ug.startup", provider = %provider, keys = key_set.len(), "Signing keys loaded");
            Ok(Arc::new(key_set))
        }
        Err(source) => {
            record_jwks_fetch(provider.as_str(), "error");
            Err(StartupError::Jwks {
                provider,
                url: jwks_url.to_string(),
                source,
            })
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/` - Liveness message - public
/// - `/health` - Liveness probe (simple "OK") - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/api/{provider}/sync/{jwt|secret}` - one route per enabled capability
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - Request timeout of `REQUEST_TIMEOUT_SECONDS`
///
/// Sync routes whose capability is disabled are never registered and fall
/// through to the router's 404.
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let mut sync_routes = Router::new();
    for route in state.capabilities.enabled_routes() {
        let Some(provider_state) = state.provider(route.provider) else {
            continue;
        };
        let path = route.path();
        let sync_state = Arc::new(SyncState {
            trigger: provider_state.trigger.clone(),
        });

        let router = Router::new().route(&path, post(handlers::sync_image));
        let router = match route.scheme {
            AuthScheme::Jwt => {
                let auth_state = Arc::new(JwtAuthState {
                    provider: route.provider,
                    jwt_validator: provider_state.jwt_validator.clone(),
                });
                router.route_layer(middleware::from_fn_with_state(auth_state, require_jwt))
            }
            AuthScheme::Secret => {
                let Some(shared_secret) = state.shared_secret.clone() else {
                    continue;
                };
                let auth_state = Arc::new(SecretAuthState {
                    provider: route.provider,
                    shared_secret,
                });
                router.route_layer(middleware::from_fn_with_state(
                    auth_state,
                    require_shared_secret,
                ))
            }
        };

        tracing::info!(target: "ug.routes", path = %path, "Registered sync route");
        sync_routes = sync_routes.merge(router.with_state(sync_state));
    }

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(sync_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
