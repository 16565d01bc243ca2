//! Release lookup against a GitHub-compatible API
//!
//! Release metadata is fetched lazily and cached for the lifetime of the
//! `VersionInfo`; `check_latest` forces a refresh.

use std::cmp::Ordering;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use ureq::Agent;

use crate::error::{Error, Result};
use crate::update::replace_current_exe;
use crate::version::compare_versions;
use crate::{DEV_TAG, DEV_VERSION};

/// Where to look for releases and what we are running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseConfig {
    /// API root, with trailing slash
    pub base_url: String,
    pub owner: String,
    pub repo: String,
    /// Version of the running build
    pub current_version: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ReleaseConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.github.com/".into(),
            owner: "watchroom".into(),
            repo: "watchroom".into(),
            current_version: DEV_VERSION.into(),
            timeout_secs: 30,
        }
    }
}

impl ReleaseConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_current_version(mut self, version: impl Into<String>) -> Self {
        self.current_version = version.into();
        self
    }
}

/// A published release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

/// A downloadable file attached to a release
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

impl Release {
    /// Download URL of the first asset whose name starts with `prefix`
    pub fn binary_url(&self, prefix: &str) -> Result<String> {
        self.assets
            .iter()
            .find(|a| a.name.starts_with(prefix))
            .map(|a| a.browser_download_url.clone())
            .ok_or_else(|| Error::NoBinaryFound(prefix.to_string()))
    }
}

/// What `self_update` did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Already on the latest release
    UpToDate,
    /// Running a build newer than the latest release
    Ahead,
    /// Binary replaced with the asset at `url`
    Updated { url: String },
}

/// Release checker for one repository
pub struct VersionInfo {
    config: ReleaseConfig,
    agent: Agent,
    latest: Mutex<Option<Release>>,
    dev: Mutex<Option<Release>>,
}

impl VersionInfo {
    pub fn new(mut config: ReleaseConfig) -> Result<Self> {
        if config.base_url.is_empty() {
            config.base_url = ReleaseConfig::default().base_url;
        }
        if !config.base_url.ends_with('/') {
            config.base_url.push('/');
        }

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();

        Ok(Self {
            config,
            agent,
            latest: Mutex::new(None),
            dev: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &ReleaseConfig {
        &self.config
    }

    /// Version of the running build
    pub fn current(&self) -> &str {
        &self.config.current_version
    }

    /// Tag of the latest release, fetched once and cached
    pub fn latest(&self) -> Result<String> {
        Ok(self.latest_release()?.tag_name)
    }

    /// Tag of the latest release, always asking the API
    pub fn check_latest(&self) -> Result<String> {
        let release = self.fetch("releases/latest")?;
        let tag = release.tag_name.clone();
        *self.latest.lock() = Some(release);
        Ok(tag)
    }

    pub fn latest_binary_url(&self) -> Result<String> {
        self.latest_release()?.binary_url(&self.asset_prefix())
    }

    pub fn dev_binary_url(&self) -> Result<String> {
        self.dev_release()?.binary_url(&self.asset_prefix())
    }

    /// True when the running build is older than the latest release.
    ///
    /// Development builds never need an update.
    pub fn need_update(&self) -> Result<bool> {
        if self.current() == DEV_VERSION {
            return Ok(false);
        }

        let latest = self.latest()?;
        Ok(compare_versions(self.current(), &latest)? == Ordering::Less)
    }

    /// Replace the running binary with a newer release.
    ///
    /// With `dev` set, always installs the latest development build. A
    /// development build installs the latest release unconditionally.
    #[instrument(skip(self), fields(current = %self.current()))]
    pub fn self_update(&self, dev: bool) -> Result<UpdateOutcome> {
        if dev {
            info!("self update: dev mode, update to latest dev version");
        } else if self.current() != DEV_VERSION {
            let latest = self.latest()?;
            match compare_versions(self.current(), &latest)? {
                Ordering::Equal => {
                    info!("self update: current version is latest: {}", self.current());
                    return Ok(UpdateOutcome::UpToDate);
                }
                Ordering::Less => {
                    info!(
                        "self update: current version is less than latest: {} -> {}",
                        self.current(),
                        latest
                    );
                }
                Ordering::Greater => {
                    info!(
                        "self update: current version is greater than latest: {} ? {}",
                        self.current(),
                        latest
                    );
                    return Ok(UpdateOutcome::Ahead);
                }
            }
        } else {
            info!("self update: current version is dev, force update");
        }

        let url = if dev {
            self.dev_binary_url()?
        } else {
            self.latest_binary_url()?
        };

        replace_current_exe(&self.agent, &url)?;
        Ok(UpdateOutcome::Updated { url })
    }

    fn latest_release(&self) -> Result<Release> {
        let mut cached = self.latest.lock();
        if let Some(release) = cached.as_ref() {
            return Ok(release.clone());
        }
        let release = self.fetch("releases/latest")?;
        *cached = Some(release.clone());
        Ok(release)
    }

    fn dev_release(&self) -> Result<Release> {
        let mut cached = self.dev.lock();
        if let Some(release) = cached.as_ref() {
            return Ok(release.clone());
        }
        let release = self.fetch(&format!("releases/tags/{DEV_TAG}"))?;
        *cached = Some(release.clone());
        Ok(release)
    }

    fn fetch(&self, path: &str) -> Result<Release> {
        let url = format!(
            "{}repos/{}/{}/{}",
            self.config.base_url, self.config.owner, self.config.repo, path
        );
        debug!(%url, "Fetching release");

        let response = self
            .agent
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .header("User-Agent", "watchroom-release")
            .call()?;

        let (_parts, body) = response.into_parts();
        let release = serde_json::from_reader(body.into_reader())?;
        Ok(release)
    }

    /// Asset name prefix for this platform, e.g. `watchroom-linux-amd64`
    pub fn asset_prefix(&self) -> String {
        format!("{}-{}-{}", self.config.repo, std::env::consts::OS, asset_arch())
    }
}

/// Architecture name as used in release asset names
fn asset_arch() -> &'static str {
    match std::env::consts::ARCH {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        other => other,
    }
}
