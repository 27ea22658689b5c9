//! Configuration file handling

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

use super::paths::{config_location, ConfigLocation};
use super::Result;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Service under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Timeout settings
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Scheduling settings
    #[serde(default)]
    pub run: RunConfig,
}

/// The GraphQL endpoint and request decoration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct TargetConfig {
    /// Default endpoint when neither the CLI nor the suite names one
    pub endpoint: Option<String>,

    /// Extra headers sent with every request (e.g. `Authorization`)
    #[serde(default)]
    pub headers: BTreeMap<String, String>,

    /// Reject non-2xx responses instead of inspecting them
    #[serde(default)]
    pub fail_on_status: bool,
}

/// Timeout settings in seconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Timeout for a single GraphQL request
    #[serde(default = "default_request")]
    pub request_secs: u64,
}

impl Timeouts {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            request_secs: default_request(),
        }
    }
}

fn default_request() -> u64 {
    30
}

/// Scheduling settings
#[derive(Debug, Deserialize)]
pub struct RunConfig {
    /// Maximum number of scenarios in flight at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
        }
    }
}

fn default_concurrency() -> usize {
    4
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        let location = config_location();
        if let Some(location) = &location {
            debug!("Config location: {}", location.path().display());
        }
        Self::load_at(location)
    }

    /// A missing explicit file is an error; a missing default one is not
    fn load_at(location: Option<ConfigLocation>) -> Result<Self> {
        match location {
            Some(ConfigLocation::Explicit(path)) => Self::load_from(&path),
            Some(ConfigLocation::Default(path)) if path.exists() => Self::load_from(&path),
            Some(ConfigLocation::Default(path)) => {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        let config: Self =
            toml::from_str(&content).map_err(|e| super::Error::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.run.concurrency == 0 {
            return Err(super::Error::Config(
                "run.concurrency must be at least 1".to_string(),
            ));
        }
        if self.timeouts.request_secs == 0 {
            return Err(super::Error::Config(
                "timeouts.request_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
