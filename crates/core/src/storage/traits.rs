//! Storage repository traits
//!
//! The registry only talks to persistence through these traits, so it can run
//! against SQLite, a mock, or a future remote backend.

use crate::error::Result;
use crate::models::{CreateRoomConfig, RoomId, RoomRecord};

/// Durable room records
///
/// Every call may fail; callers propagate errors unchanged.
pub trait RoomRepository: Send + Sync {
    /// Allocate a new room with a fresh identifier.
    ///
    /// Fails with `InvalidRoomName` for a blank name and `AlreadyExists` when
    /// the name is taken.
    fn create_room(
        &self,
        name: &str,
        password: &str,
        config: &CreateRoomConfig,
    ) -> Result<RoomRecord>;

    /// Fetch a room, failing with `NotFound` when it does not exist
    fn get_room_by_id(&self, id: RoomId) -> Result<RoomRecord>;

    /// Fetch every stored room
    fn get_all_rooms(&self) -> Result<Vec<RoomRecord>>;

    /// Check whether a room exists
    fn has_room(&self, id: RoomId) -> Result<bool>;

    /// Check whether a room name is taken
    fn has_room_by_name(&self, name: &str) -> Result<bool>;

    /// Delete a room, failing with `NotFound` when nothing was deleted
    fn delete_room_by_id(&self, id: RoomId) -> Result<()>;

    /// Replace the stored password hash of a room
    fn set_room_password(&self, id: RoomId, hashed_password: &str) -> Result<()>;
}
