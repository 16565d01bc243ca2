//! Room record model - the persisted half of a room

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Stable room identifier, assigned at creation
pub type RoomId = Uuid;

/// Visibility and behaviour settings stored with a room
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSettings {
    /// Hidden rooms are left out of public listings
    pub hidden: bool,
}

/// A room as stored by the persistence layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomRecord {
    pub id: RoomId,
    pub name: String,
    /// Argon2 PHC string, empty when the room has no password
    #[serde(default, skip_serializing)]
    pub hashed_password: String,
    pub settings: RoomSettings,
    pub creator_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl RoomRecord {
    pub fn new(name: String, hashed_password: String, config: &CreateRoomConfig) -> Self {
        Self {
            id: Uuid::new_v4(),
            name,
            hashed_password,
            settings: RoomSettings {
                hidden: config.hidden,
            },
            creator_id: config.creator_id,
            created_at: Utc::now(),
        }
    }

    pub fn need_password(&self) -> bool {
        !self.hashed_password.is_empty()
    }
}

/// Reject room names that are blank once trimmed
pub fn validate_room_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::InvalidRoomName(format!("{name:?} is blank")));
    }
    Ok(())
}

/// Extra options applied when creating a room
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRoomConfig {
    /// Create the room hidden from public listings
    pub hidden: bool,
    /// User that created the room, if known
    pub creator_id: Option<Uuid>,
}

impl CreateRoomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    pub fn with_creator(mut self, creator_id: Uuid) -> Self {
        self.creator_id = Some(creator_id);
        self
    }
}
