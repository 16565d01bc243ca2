//! Server configuration
//!
//! Read from `watchroom.toml` in the platform config directory, or from the
//! path given on the command line. A missing file means defaults.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use watchroom_release::{ReleaseConfig, DEV_VERSION};

use crate::error::{Error, Result};

const CONFIG_FILE: &str = "watchroom.toml";
const DATABASE_FILE: &str = "watchroom.db";

/// Version baked in by release builds
pub const BUILD_VERSION: &str = match option_env!("WATCHROOM_VERSION") {
    Some(v) => v,
    None => DEV_VERSION,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// SQLite database file; defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// Look for a newer release after startup
    pub check_update: bool,
    pub release: ReleaseConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            database_path: None,
            check_update: true,
            release: ReleaseConfig::default().with_current_version(BUILD_VERSION),
        }
    }
}

impl ServerConfig {
    /// Load from `path`, or from the default location when `None`
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::dirs()?.config_dir().join(CONFIG_FILE),
        };

        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path)?;
        Self::parse(&text).map_err(|source| Error::Config {
            path: path.display().to_string(),
            source,
        })
    }

    fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        let mut config: Self = toml::from_str(text)?;
        // The running build always knows its own version best
        if config.release.current_version == DEV_VERSION {
            config.release.current_version = BUILD_VERSION.to_string();
        }
        Ok(config)
    }

    /// Database location, creating its parent directory
    pub fn database_path(&self) -> Result<PathBuf> {
        let path = match &self.database_path {
            Some(p) => p.clone(),
            None => Self::dirs()?.data_dir().join(DATABASE_FILE),
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }

    fn dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "watchroom", "watchroom").ok_or(Error::NoDataDir)
    }
}
