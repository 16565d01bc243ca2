//! Watchroom Release Library
//!
//! Checks a GitHub-compatible release API for newer builds and replaces the
//! running binary with the matching release asset.
//!
//! # Usage
//!
//! ```ignore
//! let info = VersionInfo::new(ReleaseConfig::default().with_current_version("1.2.0"))?;
//! if info.need_update()? {
//!     info.self_update(false)?;
//! }
//! ```

pub mod checker;
pub mod error;
mod update;
pub mod version;

pub use checker::{Asset, Release, ReleaseConfig, UpdateOutcome, VersionInfo};
pub use error::{Error, Result};
pub use version::compare_versions;

/// Version string reported by unreleased builds
pub const DEV_VERSION: &str = "dev";

/// Release tag that tracks development builds
pub const DEV_TAG: &str = "dev";
