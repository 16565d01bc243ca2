//! Watchroom Core Library
//!
//! Shared playback clock, room aggregate, concurrent room registry and
//! storage for the Watchroom synchronized viewing service.

pub mod bootstrap;
pub mod current;
pub mod error;
pub mod invariants;
pub mod models;
pub mod password;
pub mod registry;
pub mod room;
pub mod status;
pub mod storage;
#[cfg(test)]
mod testing;

pub use bootstrap::init_rooms;
pub use current::{Current, CurrentSnapshot};
pub use error::{Error, Result};
pub use models::*;
pub use registry::{Registration, RoomRegistry};
pub use room::{Room, RoomOptions};
pub use status::{project_seek, Status};
pub use storage::{Database, RoomRepository};
