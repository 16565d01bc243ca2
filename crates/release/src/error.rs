//! Release error types

use std::io;

/// Release result type
pub type Result<T> = std::result::Result<T, Error>;

/// Release and self-update errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] ureq::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid release payload: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No binary found for {0}")]
    NoBinaryFound(String),

    #[error("Invalid version: {0}")]
    InvalidVersion(String),
}
