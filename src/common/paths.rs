//! Configuration paths
//!
//! Uses the directories crate for platform-appropriate locations:
//! - Linux: `~/.config/gqlcheck/`
//! - macOS: `~/Library/Application Support/gqlcheck/`
//! - Windows: `%APPDATA%\gqlcheck\`

use std::path::{Path, PathBuf};

/// Application name used for config directories
const APP_NAME: &str = "gqlcheck";

/// Environment variable that points at an explicit config file
pub const CONFIG_ENV: &str = "GQLCHECK_CONFIG";

/// Get the configuration directory path
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// Where the configuration file is expected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigLocation {
    /// Named by `GQLCHECK_CONFIG`; must exist
    Explicit(PathBuf),
    /// Platform default; may be absent
    Default(PathBuf),
}

impl ConfigLocation {
    pub fn path(&self) -> &Path {
        match self {
            ConfigLocation::Explicit(path) | ConfigLocation::Default(path) => path,
        }
    }
}

/// Get the location of the configuration file
///
/// `GQLCHECK_CONFIG` wins over the platform default.
pub fn config_location() -> Option<ConfigLocation> {
    if let Ok(explicit) = std::env::var(CONFIG_ENV) {
        if !explicit.is_empty() {
            return Some(ConfigLocation::Explicit(PathBuf::from(explicit)));
        }
    }
    config_dir().map(|dir| ConfigLocation::Default(dir.join("config.toml")))
}
