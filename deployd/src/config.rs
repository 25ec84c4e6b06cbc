//! Service configuration
//!
//! All configuration is read from the process environment once at startup
//! and treated as immutable afterwards. Request handlers never consult the
//! environment directly.

use std::env;
use std::path::PathBuf;

use secrecy::SecretString;
use tracing::warn;

use crate::errors::DispatcherError;

/// Identifies one (service, environment) deploy target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetId {
    BackendTest,
    BackendProd,
    FrontendTest,
    FrontendProd,
}

impl TargetId {
    pub const ALL: [TargetId; 4] = [
        TargetId::BackendTest,
        TargetId::BackendProd,
        TargetId::FrontendTest,
        TargetId::FrontendProd,
    ];

    /// Environment variable holding the branch this target deploys from
    pub fn branch_env_key(&self) -> &'static str {
        match self {
            TargetId::BackendTest => "PEERS_BACKEND_TEST_BRANCH",
            TargetId::BackendProd => "PEERS_BACKEND_PROD_BRANCH",
            TargetId::FrontendTest => "PEERS_FRONTEND_TEST_BRANCH",
            TargetId::FrontendProd => "PEERS_FRONTEND_PROD_BRANCH",
        }
    }

    /// Build-tool target invoked when this deploy target fires
    pub fn command(&self) -> &'static str {
        match self {
            TargetId::BackendTest => "deployPeersTestBackend",
            TargetId::BackendProd => "deployPeersProdBackend",
            TargetId::FrontendTest => "deployPeersTestFrontend",
            TargetId::FrontendProd => "deployPeersProdFrontend",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TargetId::BackendTest => "backend-test",
            TargetId::BackendProd => "backend-prod",
            TargetId::FrontendTest => "frontend-test",
            TargetId::FrontendProd => "frontend-prod",
        }
    }
}

/// One configured deploy target
#[derive(Debug, Clone)]
pub struct DeployTarget {
    pub id: TargetId,

    /// Branch that triggers a deploy. None when the environment variable is
    /// unset; deliveries for the target are then ignored.
    pub branch: Option<String>,
}

impl DeployTarget {
    fn from_env(id: TargetId) -> Self {
        let branch = env::var(id.branch_env_key()).ok().filter(|b| !b.is_empty());
        if branch.is_none() {
            warn!(
                "{} is not set; {} deliveries will be ignored",
                id.branch_env_key(),
                id.name()
            );
        }
        Self { id, branch }
    }

    /// Fully qualified git ref a push must carry to trigger this target
    pub fn expected_ref(&self) -> Option<String> {
        self.branch.as_ref().map(|b| format!("refs/heads/{}", b))
    }

    pub fn command(&self) -> &'static str {
        self.id.command()
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }
}

/// The four deploy targets, always all present
#[derive(Debug, Clone)]
pub struct Targets {
    pub backend_test: DeployTarget,
    pub backend_prod: DeployTarget,
    pub frontend_test: DeployTarget,
    pub frontend_prod: DeployTarget,
}

impl Targets {
    fn from_env() -> Self {
        Self {
            backend_test: DeployTarget::from_env(TargetId::BackendTest),
            backend_prod: DeployTarget::from_env(TargetId::BackendProd),
            frontend_test: DeployTarget::from_env(TargetId::FrontendTest),
            frontend_prod: DeployTarget::from_env(TargetId::FrontendProd),
        }
    }

    pub fn get(&self, id: TargetId) -> &DeployTarget {
        match id {
            TargetId::BackendTest => &self.backend_test,
            TargetId::BackendProd => &self.backend_prod,
            TargetId::FrontendTest => &self.frontend_test,
            TargetId::FrontendProd => &self.frontend_prod,
        }
    }
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerOptions {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3011,
        }
    }
}

/// Immutable service configuration, constructed once at startup
#[derive(Debug)]
pub struct Config {
    /// Server configuration
    pub server: ServerOptions,

    /// Service name reported by the health endpoint
    pub service_name: String,

    /// Shared secret for webhook signature verification
    pub webhook_secret: SecretString,

    /// Build-tool binary the deploy commands are passed to
    pub build_tool: String,

    /// Working directory deploy commands run in
    pub work_dir: PathBuf,

    /// Per-target branch configuration
    pub targets: Targets,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// A missing webhook secret is fatal; everything else has defaults.
    pub fn from_env() -> Result<Self, DispatcherError> {
        let webhook_secret = env::var("WEBHOOK_SECRET")
            .map(SecretString::from)
            .map_err(|_| {
                DispatcherError::ConfigError("WEBHOOK_SECRET must be set".to_string())
            })?;

        let port = match env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().map_err(|_| {
                DispatcherError::ConfigError(format!("Invalid PORT value: {}", raw))
            })?,
            Err(_) => ServerOptions::default().port,
        };
        let host = env::var("HOST").unwrap_or_else(|_| ServerOptions::default().host);

        Ok(Self {
            server: ServerOptions { host, port },
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "peers-deployd".to_string()),
            webhook_secret,
            build_tool: env::var("BUILD_TOOL").unwrap_or_else(|_| "make".to_string()),
            work_dir: env::var("DEPLOY_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(".")),
            targets: Targets::from_env(),
        })
    }

    pub fn target(&self, id: TargetId) -> &DeployTarget {
        self.targets.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_ids_map_to_branch_keys_and_commands() {
        assert_eq!(
            TargetId::BackendTest.branch_env_key(),
            "PEERS_BACKEND_TEST_BRANCH"
        );
        assert_eq!(TargetId::BackendTest.command(), "deployPeersTestBackend");
        assert_eq!(
            TargetId::FrontendProd.branch_env_key(),
            "PEERS_FRONTEND_PROD_BRANCH"
        );
        assert_eq!(TargetId::FrontendProd.command(), "deployPeersProdFrontend");
    }

    #[test]
    fn expected_ref_is_fully_qualified() {
        let target = DeployTarget {
            id: TargetId::BackendTest,
            branch: Some("test".to_string()),
        };
        assert_eq!(target.expected_ref().as_deref(), Some("refs/heads/test"));
    }

    #[test]
    fn unconfigured_target_has_no_expected_ref() {
        let target = DeployTarget {
            id: TargetId::BackendProd,
            branch: None,
        };
        assert_eq!(target.expected_ref(), None);
    }
}
