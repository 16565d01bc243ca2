//! Room aggregate - persisted attributes, live playback state and the
//! password version stamp
//!
//! A `Room` is the in-memory face of one stored room. Its `Current` is created
//! with it and never replaced. The version stamp is a CRC-32 of the hashed
//! password; sessions remember it and compare later to notice a password
//! change without fetching the hash again.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::current::{Current, CurrentSnapshot};
use crate::error::{Error, Result};
use crate::models::{MovieInfo, RoomId, RoomRecord, RoomSettings};
use crate::password::{hash_password, password_version, verify_password};
use crate::status::Status;
use crate::storage::RoomRepository;

/// Options applied when a room is brought into memory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoomOptions {
    /// Use this version stamp instead of deriving it from the password hash
    pub version: Option<u32>,
}

impl RoomOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }
}

/// A loaded room
pub struct Room {
    id: RoomId,
    record: RwLock<RoomRecord>,
    version: AtomicU32,
    current: Current,
    closed: AtomicBool,
    /// Serializes password changes so the durable write and the cached
    /// stamp advance in the same order
    password_lock: Mutex<()>,
    repo: Arc<dyn RoomRepository>,
}

impl Room {
    pub(crate) fn new(
        record: RoomRecord,
        repo: Arc<dyn RoomRepository>,
        options: RoomOptions,
    ) -> Self {
        // Rows written before names were validated can still be blank
        if record.name.trim().is_empty() {
            warn!(room_id = %record.id, "Loading room with a blank name");
        }

        let version = options
            .version
            .unwrap_or_else(|| password_version(&record.hashed_password));

        Self {
            id: record.id,
            record: RwLock::new(record),
            version: AtomicU32::new(version),
            current: Current::new(),
            closed: AtomicBool::new(false),
            password_lock: Mutex::new(()),
            repo,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> String {
        self.record.read().name.clone()
    }

    /// Copy of the persisted attributes as last known in memory
    pub fn record(&self) -> RoomRecord {
        self.record.read().clone()
    }

    pub fn settings(&self) -> RoomSettings {
        self.record.read().settings
    }

    pub fn is_hidden(&self) -> bool {
        self.record.read().settings.hidden
    }

    pub fn creator_id(&self) -> Option<Uuid> {
        self.record.read().creator_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.record.read().created_at
    }

    pub fn need_password(&self) -> bool {
        self.record.read().need_password()
    }

    pub fn check_password(&self, password: &str) -> bool {
        let hashed = self.record.read().hashed_password.clone();
        verify_password(&hashed, password)
    }

    /// Current password version stamp
    pub fn version(&self) -> u32 {
        self.version.load(Ordering::Acquire)
    }

    /// True when `version` still matches the room's password
    pub fn check_version(&self, version: u32) -> bool {
        self.version() == version
    }

    /// Live playback state
    pub fn current(&self) -> &Current {
        &self.current
    }

    pub fn movie(&self) -> MovieInfo {
        self.current.movie()
    }

    pub fn status(&self) -> Status {
        self.current.status()
    }

    /// Serializable movie and status, exact as of now
    pub fn snapshot(&self) -> CurrentSnapshot {
        self.current.snapshot()
    }

    pub fn set_movie(&self, movie: MovieInfo) -> Result<CurrentSnapshot> {
        self.ensure_open()?;
        Ok(self.current.set_movie(movie))
    }

    /// Apply a client-reported status. Non-finite values fail with
    /// `InvalidStatus` and leave the clock untouched.
    pub fn set_status(
        &self,
        playing: bool,
        seek: f64,
        rate: f64,
        time_diff: f64,
    ) -> Result<Status> {
        self.ensure_open()?;
        self.current.set_status(playing, seek, rate, time_diff)
    }

    pub fn set_seek_rate(&self, seek: f64, rate: f64, time_diff: f64) -> Result<Status> {
        self.ensure_open()?;
        self.current.set_seek_rate(seek, rate, time_diff)
    }

    /// Change the room password, returning the new version stamp.
    ///
    /// The durable write happens first; if it fails the in-memory hash and
    /// version are left untouched.
    #[instrument(skip(self, password), fields(room_id = %self.id))]
    pub fn set_password(&self, password: &str) -> Result<u32> {
        self.ensure_open()?;
        let hashed = hash_password(password)?;
        let version = password_version(&hashed);

        let _guard = self.password_lock.lock();
        self.repo.set_room_password(self.id, &hashed)?;
        self.record.write().hashed_password = hashed;
        self.version.store(version, Ordering::Release);

        info!(version, "Room password changed");
        Ok(version)
    }

    /// Detach live state. Later mutations fail with `RoomClosed`.
    ///
    /// Returns false if the room was already closed.
    pub fn close(&self) -> bool {
        let was_open = !self.closed.swap(true, Ordering::AcqRel);
        if was_open {
            debug!(room_id = %self.id, "Room closed");
        }
        was_open
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(Error::RoomClosed(self.id));
        }
        Ok(())
    }
}

impl fmt::Debug for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Room")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("version", &self.version())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
