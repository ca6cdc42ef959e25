//! Startup-time capability table.
//!
//! Decides, once, which sync routes the router registers. A provider's JWT
//! route exists when its credential group is configured; its shared-secret
//! route additionally requires `SECRET_TOKEN`. Requests to routes that were
//! not registered get the router's 404.

use crate::config::Config;
use crate::models::{AuthScheme, Provider};

/// Which credential groups are fully configured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Capabilities {
    pub gitlab: bool,
    pub github: bool,
    pub shared_secret: bool,
}

/// A sync route to register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SyncRoute {
    pub provider: Provider,
    pub scheme: AuthScheme,
}

impl SyncRoute {
    /// Router path, e.g. `/api/gitlab/sync/jwt`.
    pub fn path(&self) -> String {
        format!("/api/{}/sync/{}", self.provider, self.scheme)
    }
}

impl Capabilities {
    pub fn from_config(config: &Config) -> Self {
        Self {
            gitlab: config.gitlab.is_some(),
            github: config.github.is_some(),
            shared_secret: config.shared_secret.is_some(),
        }
    }

    /// Whether the provider's credential group is configured.
    pub fn provider_enabled(&self, provider: Provider) -> bool {
        match provider {
            Provider::Gitlab => self.gitlab,
            Provider::Github => self.github,
        }
    }

    /// Routes to register, in a stable order.
    pub fn enabled_routes(&self) -> Vec<SyncRoute> {
        let mut routes = Vec::new();
        for provider in [Provider::Gitlab, Provider::Github] {
            if !self.provider_enabled(provider) {
                continue;
            }
            routes.push(SyncRoute {
                provider,
                scheme: AuthScheme::Jwt,
            });
            if self.shared_secret {
                routes.push(SyncRoute {
                    provider,
                    scheme: AuthScheme::Secret,
                });
            }
        }
        routes
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn paths(capabilities: Capabilities) -> Vec<String> {
        capabilities
            .enabled_routes()
            .iter()
            .map(SyncRoute::path)
            .collect()
    }

    #[test]
    fn test_no_groups_no_routes() {
        assert!(Capabilities::default().enabled_routes().is_empty());
    }

    #[test]
    fn test_secret_alone_registers_nothing() {
        let capabilities = Capabilities {
            shared_secret: true,
            ..Default::default()
        };
        assert!(capabilities.enabled_routes().is_empty());
    }

    #[test]
    fn test_gitlab_only() {
        let capabilities = Capabilities {
            gitlab: true,
            ..Default::default()
        };
        assert_eq!(paths(capabilities), vec!["/api/gitlab/sync/jwt"]);
    }

    #[test]
    fn test_gitlab_with_secret() {
        let capabilities = Capabilities {
            gitlab: true,
            shared_secret: true,
            ..Default::default()
        };
        assert_eq!(
            paths(capabilities),
            vec!["/api/gitlab/sync/jwt", "/api/gitlab/sync/secret"]
        );
    }

    #[test]
    fn test_everything_enabled() {
        let capabilities = Capabilities {
            gitlab: true,
            github: true,
            shared_secret: true,
        };
        assert_eq!(
            paths(capabilities),
            vec![
                "/api/gitlab/sync/jwt",
                "/api/gitlab/sync/secret",
                "/api/github/sync/jwt",
                "/api/github/sync/secret",
            ]
        );
    }

    #[test]
    fn test_from_config() {
        let vars = HashMap::from([
            ("GITHUB_REPO".to_string(), "acme/images".to_string()),
            ("GITHUB_TOKEN".to_string(), "ghp_test".to_string()),
            ("GITHUB_WORKFLOW".to_string(), "unpack.yml".to_string()),
            ("SECRET_TOKEN".to_string(), "s3cret".to_string()),
        ]);
        let config = Config::from_vars(&vars).unwrap();

        let capabilities = Capabilities::from_config(&config);
        assert_eq!(
            capabilities,
            Capabilities {
                gitlab: false,
                github: true,
                shared_secret: true,
            }
        );
        assert!(capabilities.provider_enabled(Provider::Github));
        assert!(!capabilities.provider_enabled(Provider::Gitlab));
    }
}
