//! Test doubles for the persistence layer

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use crate::error::{Error, Result};
use crate::models::{CreateRoomConfig, RoomId, RoomRecord};
use crate::storage::{Database, RoomRepository};

/// In-memory database that counts calls and can be told to fail
pub struct FlakyRepository {
    inner: Database,
    pub fail_password_writes: AtomicBool,
    pub fail_lookups: AtomicBool,
    pub fail_deletes: AtomicBool,
    pub deletes: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl FlakyRepository {
    pub fn new() -> Self {
        Self {
            inner: Database::open_in_memory().unwrap(),
            fail_password_writes: AtomicBool::new(false),
            fail_lookups: AtomicBool::new(false),
            fail_deletes: AtomicBool::new(false),
            deletes: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    fn check_lookups(&self) -> Result<()> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(Error::Persistence("connection reset".into()));
        }
        Ok(())
    }
}

impl RoomRepository for FlakyRepository {
    fn create_room(
        &self,
        name: &str,
        password: &str,
        config: &CreateRoomConfig,
    ) -> Result<RoomRecord> {
        self.inner.create_room(name, password, config)
    }

    fn get_room_by_id(&self, id: RoomId) -> Result<RoomRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.check_lookups()?;
        self.inner.get_room_by_id(id)
    }

    fn get_all_rooms(&self) -> Result<Vec<RoomRecord>> {
        self.check_lookups()?;
        self.inner.get_all_rooms()
    }

    fn has_room(&self, id: RoomId) -> Result<bool> {
        self.check_lookups()?;
        self.inner.has_room(id)
    }

    fn has_room_by_name(&self, name: &str) -> Result<bool> {
        self.check_lookups()?;
        self.inner.has_room_by_name(name)
    }

    fn delete_room_by_id(&self, id: RoomId) -> Result<()> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("disk I/O error".into()));
        }
        self.inner.delete_room_by_id(id)
    }

    fn set_room_password(&self, id: RoomId, hashed_password: &str) -> Result<()> {
        if self.fail_password_writes.load(Ordering::SeqCst) {
            return Err(Error::Persistence("database is read-only".into()));
        }
        self.inner.set_room_password(id, hashed_password)
    }
}
