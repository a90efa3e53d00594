//! Runtime configuration for pack installation.

use std::path::PathBuf;
use std::time::Duration;

use crate::catalog::CatalogSettings;
use crate::config::{ConfigFile, DEFAULT_USER_AGENT};
use crate::manager::download::{HttpTransport, TransferResult, DEFAULT_TIMEOUT_SECS};

/// Configuration for [`PackInstaller`](super::PackInstaller).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerConfig {
    /// Root directory packs are installed under.
    pub output_dir: PathBuf,

    /// Re-download files even when they are already present and valid.
    pub force: bool,

    /// Catalog endpoint settings.
    pub catalog: CatalogSettings,

    /// Identification header sent with every request.
    pub user_agent: String,

    /// HTTP request timeout.
    pub timeout: Duration,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            force: false,
            catalog: CatalogSettings::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ManagerConfig {
    /// Create a new configuration with the given output directory.
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Default::default()
        }
    }

    /// Configuration from the settings file.
    pub fn from_config_file(config: &ConfigFile) -> Self {
        Self {
            output_dir: config
                .paths
                .output_dir
                .clone()
                .unwrap_or_else(|| PathBuf::from(".")),
            force: false,
            catalog: config.catalog.settings(),
            user_agent: config.catalog.user_agent.clone(),
            timeout: Duration::from_secs(config.download.timeout),
        }
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, path: PathBuf) -> Self {
        self.output_dir = path;
        self
    }

    /// Set the force flag.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build the HTTP transport these settings describe.
    pub fn transport(&self) -> TransferResult<HttpTransport> {
        HttpTransport::with_timeout(&self.user_agent, self.timeout)
    }
}
