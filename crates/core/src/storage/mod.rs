//! SQLite storage layer for Watchroom

mod migrations;
mod parse;
mod rooms;
mod traits;

use parking_lot::Mutex;
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::{Error, Result};
use crate::invariants::assert_room_record_invariants;
use crate::models::{validate_room_name, CreateRoomConfig, RoomId, RoomRecord};
use crate::password::hash_password;

pub use rooms::RoomStore;
pub use traits::RoomRepository;

/// Main database handle
///
/// The connection is serialized behind a mutex so one handle can be shared
/// by every request thread.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init(conn)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Initialize database schema via migrations
    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .lock()
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }
}

impl RoomRepository for Database {
    fn create_room(
        &self,
        name: &str,
        password: &str,
        config: &CreateRoomConfig,
    ) -> Result<RoomRecord> {
        validate_room_name(name)?;

        // Hash before taking the connection; Argon2 is deliberately slow.
        let hashed = hash_password(password)?;
        let record = RoomRecord::new(name.to_string(), hashed, config);
        assert_room_record_invariants(&record);

        let conn = self.conn.lock();
        let rooms = RoomStore::new(&conn);
        if rooms.exists_by_name(name)? {
            return Err(Error::AlreadyExists(format!("room name {name:?}")));
        }
        rooms.create(&record)?;
        Ok(record)
    }

    fn get_room_by_id(&self, id: RoomId) -> Result<RoomRecord> {
        let conn = self.conn.lock();
        RoomStore::new(&conn)
            .find_by_id(id)?
            .ok_or_else(|| Error::NotFound(format!("room {id}")))
    }

    fn get_all_rooms(&self) -> Result<Vec<RoomRecord>> {
        let conn = self.conn.lock();
        RoomStore::new(&conn).list_all()
    }

    fn has_room(&self, id: RoomId) -> Result<bool> {
        let conn = self.conn.lock();
        RoomStore::new(&conn).exists(id)
    }

    fn has_room_by_name(&self, name: &str) -> Result<bool> {
        let conn = self.conn.lock();
        RoomStore::new(&conn).exists_by_name(name)
    }

    fn delete_room_by_id(&self, id: RoomId) -> Result<()> {
        let conn = self.conn.lock();
        match RoomStore::new(&conn).delete(id)? {
            0 => Err(Error::NotFound(format!("room {id}"))),
            _ => Ok(()),
        }
    }

    fn set_room_password(&self, id: RoomId, hashed_password: &str) -> Result<()> {
        let conn = self.conn.lock();
        match RoomStore::new(&conn).update_password(id, hashed_password)? {
            0 => Err(Error::NotFound(format!("room {id}"))),
            _ => Ok(()),
        }
    }
}
