//! Startup loading of stored rooms into the registry

use tracing::{error, info, instrument};

use crate::error::{Error, Result};
use crate::registry::{Registration, RoomRegistry};

/// Load every stored room into `registry`, returning how many were loaded.
///
/// Runs before any traffic is served, so an ID that is already registered
/// means something is wrong and aborts startup like any other failure.
#[instrument(skip(registry))]
pub fn init_rooms(registry: &RoomRegistry) -> Result<usize> {
    let records = registry.repository().get_all_rooms()?;
    let total = records.len();

    for record in records {
        let id = record.id;
        if let Registration::Existing(_) = registry.load(record) {
            error!(room_id = %id, "Room loaded twice during startup");
            return Err(Error::AlreadyExists(format!("room {id}")));
        }
    }

    info!(rooms = total, "Rooms loaded");
    Ok(total)
}
