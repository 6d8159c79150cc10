//! CLI configuration

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use vbook_common::DEFAULT_APP_PORT;

/// Tunables of the test and install workflows
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Connect and read timeout for calls to the app, in seconds
    pub timeout_secs: u64,

    /// App port assumed when the address carries none
    pub default_port: u16,

    /// The local file server listens this many ports below the app's port
    pub server_port_offset: u16,

    /// Pause after the file server starts, in milliseconds
    pub settle_delay_ms: u64,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            default_port: DEFAULT_APP_PORT,
            server_port_offset: 10,
            settle_delay_ms: 100,
        }
    }
}

impl CliConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        debug!("Loaded config from {}: {:?}", path.display(), config);
        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Port of the local file server for an app listening on `app_port`
    pub fn server_port(&self, app_port: u16) -> Option<u16> {
        app_port
            .checked_sub(self.server_port_offset)
            .filter(|port| *port > 0)
    }
}
