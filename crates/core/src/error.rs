//! Error types for Watchroom Core

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Failure reported by a non-SQLite persistence backend
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid room name: {0}")]
    InvalidRoomName(String),

    #[error("Invalid playback status: {0}")]
    InvalidStatus(String),

    #[error("Room {0} is closed")]
    RoomClosed(Uuid),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Error::InvalidRoomName(_) | Error::InvalidStatus(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
