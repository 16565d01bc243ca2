//! Room registry - the in-memory index of loaded rooms
//!
//! The registry maps room IDs to live `Room` objects and guarantees at most
//! one live object per ID. Registration is a single compare-and-insert on the
//! map entry; every other map operation is a plain load or remove. The
//! registry never takes a room's own locks while holding a map shard.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::models::{CreateRoomConfig, RoomId, RoomRecord};
use crate::room::{Room, RoomOptions};
use crate::storage::RoomRepository;

/// Outcome of registering a room
#[derive(Debug, Clone)]
pub enum Registration {
    /// This call inserted the room
    Inserted(Arc<Room>),
    /// Another caller registered the ID first; this is its instance
    Existing(Arc<Room>),
}

impl Registration {
    pub fn room(&self) -> &Arc<Room> {
        match self {
            Registration::Inserted(room) | Registration::Existing(room) => room,
        }
    }

    pub fn into_room(self) -> Arc<Room> {
        match self {
            Registration::Inserted(room) | Registration::Existing(room) => room,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Registration::Inserted(_))
    }

    /// Treat losing the registration race as `AlreadyExists`
    pub fn into_result(self) -> Result<Arc<Room>> {
        match self {
            Registration::Inserted(room) => Ok(room),
            Registration::Existing(room) => {
                Err(Error::AlreadyExists(format!("room {}", room.id())))
            }
        }
    }
}

/// Registry of loaded rooms, shared by every request handler
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Arc<Room>>,
    repo: Arc<dyn RoomRepository>,
}

impl RoomRegistry {
    /// Create an empty registry backed by `repo`
    pub fn new(repo: Arc<dyn RoomRepository>) -> Self {
        Self {
            rooms: DashMap::new(),
            repo,
        }
    }

    /// The persistence backend rooms are loaded from
    pub fn repository(&self) -> &Arc<dyn RoomRepository> {
        &self.repo
    }

    /// Persist a new room and register it
    #[instrument(skip(self, password, config))]
    pub fn create(
        &self,
        name: &str,
        password: &str,
        config: &CreateRoomConfig,
    ) -> Result<Arc<Room>> {
        let record = self.repo.create_room(name, password, config)?;
        let room = self.load(record).into_result()?;
        info!(room_id = %room.id(), "Room created");
        Ok(room)
    }

    /// Register a stored room
    pub fn load(&self, record: RoomRecord) -> Registration {
        self.load_with(record, RoomOptions::default())
    }

    /// Register a stored room with explicit options.
    ///
    /// If the ID is already registered the existing instance wins and the
    /// candidate is never built.
    pub fn load_with(&self, record: RoomRecord, options: RoomOptions) -> Registration {
        match self.rooms.entry(record.id) {
            Entry::Occupied(entry) => {
                debug!(room_id = %record.id, "Room already registered");
                Registration::Existing(entry.get().clone())
            }
            Entry::Vacant(entry) => {
                let room = Arc::new(Room::new(record, self.repo.clone(), options));
                entry.insert(room.clone());
                Registration::Inserted(room)
            }
        }
    }

    /// Look up a room, loading it from storage on a miss
    pub fn get_by_id(&self, id: RoomId) -> Result<Arc<Room>> {
        if let Some(room) = self.get_loaded(id) {
            return Ok(room);
        }

        let record = self.repo.get_room_by_id(id)?;
        Ok(self.load(record).into_room())
    }

    /// Look up a room in memory only
    pub fn get_loaded(&self, id: RoomId) -> Option<Arc<Room>> {
        self.rooms.get(&id).map(|entry| entry.value().clone())
    }

    /// Whether a room exists in memory or in storage.
    ///
    /// A storage error counts as "not present".
    pub fn has(&self, id: RoomId) -> bool {
        if self.rooms.contains_key(&id) {
            return true;
        }

        self.repo.has_room(id).unwrap_or_else(|e| {
            warn!(room_id = %id, error = %e, "Room existence check failed");
            false
        })
    }

    /// Whether a room name is taken in storage.
    ///
    /// A storage error counts as "not taken".
    pub fn has_by_name(&self, name: &str) -> bool {
        self.repo.has_room_by_name(name).unwrap_or_else(|e| {
            warn!(room_name = %name, error = %e, "Room name check failed");
            false
        })
    }

    /// Close and unregister `room`, then delete it from storage
    #[instrument(skip(self, room), fields(room_id = %room.id()))]
    pub fn delete(&self, room: &Room) -> Result<()> {
        room.close();
        self.rooms.remove(&room.id());
        self.repo.delete_room_by_id(room.id())
    }

    /// Close and unregister a room by ID, then delete it from storage.
    ///
    /// An ID that is not loaded skips straight to the storage delete.
    #[instrument(skip(self))]
    pub fn delete_by_id(&self, id: RoomId) -> Result<()> {
        if let Some((_, room)) = self.rooms.remove(&id) {
            room.close();
        }
        self.repo.delete_room_by_id(id)
    }

    /// Change a room's password, returning its new version stamp
    pub fn set_room_password(&self, id: RoomId, password: &str) -> Result<u32> {
        self.get_by_id(id)?.set_password(password)
    }

    /// Every loaded room
    pub fn get_all(&self) -> Vec<Arc<Room>> {
        self.collect_where(|_| true)
    }

    /// Loaded rooms that can be joined without a password
    pub fn get_all_with_no_password_required(&self) -> Vec<Arc<Room>> {
        self.collect_where(|room| !room.need_password())
    }

    /// Loaded rooms that are not hidden
    pub fn get_all_without_hidden(&self) -> Vec<Arc<Room>> {
        self.collect_where(|room| !room.is_hidden())
    }

    /// Filter a copy of the loaded rooms; `keep` runs after every shard
    /// guard has been released, so it may take room locks freely.
    fn collect_where(&self, keep: impl Fn(&Room) -> bool) -> Vec<Arc<Room>> {
        let rooms: Vec<Arc<Room>> = self
            .rooms
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        rooms.into_iter().filter(|room| keep(room)).collect()
    }

    /// Number of loaded rooms
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::testing::FlakyRepository;
    use std::collections::HashSet;
    use std::sync::atomic::Ordering;
    use std::sync::Barrier;
    use std::thread;

    fn registry() -> RoomRegistry {
        RoomRegistry::new(Arc::new(Database::open_in_memory().unwrap()))
    }

    #[test]
    fn test_create_registers_room() {
        let registry = registry();
        let room = registry
            .create("Lobby", "", &CreateRoomConfig::new())
            .unwrap();

        assert_eq!(registry.len(), 1);
        let found = registry.get_by_id(room.id()).unwrap();
        assert!(Arc::ptr_eq(&room, &found));
        assert!(registry.has(room.id()));
        assert!(registry.has_by_name("Lobby"));
    }

    #[test]
    fn test_create_duplicate_name() {
        let registry = registry();
        registry.create("Lobby", "", &CreateRoomConfig::new()).unwrap();

        let err = registry
            .create("Lobby", "", &CreateRoomConfig::new())
            .unwrap_err();
        assert!(err.is_already_exists());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_create_blank_name_stores_nothing() {
        let registry = registry();

        let err = registry.create("", "", &CreateRoomConfig::new()).unwrap_err();
        assert!(matches!(err, Error::InvalidRoomName(_)));
        assert!(registry.is_empty());
        assert!(registry.repository().get_all_rooms().unwrap().is_empty());
    }

    #[test]
    fn test_load_blank_legacy_name() {
        let registry = registry();
        let record = RoomRecord::new(String::new(), String::new(), &CreateRoomConfig::new());

        let registration = registry.load(record);
        assert!(registration.is_inserted());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_listing_while_password_changes() {
        let registry = Arc::new(registry());
        for name in ["north", "south", "east", "west"] {
            registry.create(name, "", &CreateRoomConfig::new()).unwrap();
        }
        let rooms = registry.get_all();
        let barrier = Arc::new(Barrier::new(3));

        let writer = {
            let barrier = barrier.clone();
            let rooms = rooms.clone();
            thread::spawn(move || {
                barrier.wait();
                for room in &rooms {
                    room.set_password("pw").unwrap();
                }
            })
        };
        let lister = {
            let registry = registry.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..50 {
                    // Four fixed rooms plus at most one annex in flight
                    assert!(registry.get_all_with_no_password_required().len() <= 5);
                }
            })
        };
        let mover = {
            let registry = registry.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..20 {
                    let room = registry
                        .create(&format!("annex {i}"), "", &CreateRoomConfig::new())
                        .unwrap();
                    registry.delete(&room).unwrap();
                }
            })
        };

        for handle in [writer, lister, mover] {
            handle.join().unwrap();
        }
        assert_eq!(registry.len(), 4);
        assert!(registry.get_all_with_no_password_required().is_empty());
    }

    #[test]
    fn test_load_twice_returns_existing() {
        let registry = registry();
        let record = registry
            .repository()
            .create_room("Attic", "", &CreateRoomConfig::new())
            .unwrap();

        let first = registry.load(record.clone());
        assert!(first.is_inserted());

        let second = registry.load(record);
        assert!(!second.is_inserted());
        assert!(Arc::ptr_eq(first.room(), second.room()));
        assert!(second.into_result().unwrap_err().is_already_exists());
    }

    #[test]
    fn test_concurrent_load_single_winner() {
        const THREADS: usize = 16;

        let registry = Arc::new(registry());
        let record = registry
            .repository()
            .create_room("Rush", "", &CreateRoomConfig::new())
            .unwrap();
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let registry = registry.clone();
                let record = record.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    registry.load(record)
                })
            })
            .collect();

        let results: Vec<Registration> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        let inserted = results.iter().filter(|r| r.is_inserted()).count();
        assert_eq!(inserted, 1);
        assert_eq!(results.len() - inserted, THREADS - 1);

        let winner = registry.get_loaded(record.id).unwrap();
        assert!(results.iter().all(|r| Arc::ptr_eq(r.room(), &winner)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_by_id_loads_from_storage() {
        let repo = Arc::new(FlakyRepository::new());
        let registry = RoomRegistry::new(repo.clone());
        let record = repo
            .create_room("Cellar", "", &CreateRoomConfig::new())
            .unwrap();
        assert!(registry.is_empty());

        let first = registry.get_by_id(record.id).unwrap();
        let second = registry.get_by_id(record.id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(repo.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_get_by_id_not_found() {
        let registry = registry();
        let err = registry.get_by_id(uuid::Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_has_falls_back_to_storage() {
        let repo = Arc::new(FlakyRepository::new());
        let registry = RoomRegistry::new(repo.clone());
        let record = repo
            .create_room("Porch", "", &CreateRoomConfig::new())
            .unwrap();

        assert!(registry.has(record.id));
        assert!(!registry.has(uuid::Uuid::new_v4()));

        repo.fail_lookups.store(true, Ordering::SeqCst);
        assert!(!registry.has(record.id));
        assert!(!registry.has_by_name("Porch"));

        // Loaded rooms answer without asking storage
        repo.fail_lookups.store(false, Ordering::SeqCst);
        registry.get_by_id(record.id).unwrap();
        repo.fail_lookups.store(true, Ordering::SeqCst);
        assert!(registry.has(record.id));
    }

    #[test]
    fn test_delete_closes_and_removes() {
        let registry = registry();
        let room = registry.create("Garage", "", &CreateRoomConfig::new()).unwrap();

        registry.delete(&room).unwrap();
        assert!(room.is_closed());
        assert!(registry.get_loaded(room.id()).is_none());
        assert!(!registry.has(room.id()));
    }

    #[test]
    fn test_delete_storage_failure_still_unregisters() {
        let repo = Arc::new(FlakyRepository::new());
        let registry = RoomRegistry::new(repo.clone());
        let room = registry.create("Loft", "", &CreateRoomConfig::new()).unwrap();
        repo.fail_deletes.store(true, Ordering::SeqCst);

        let err = registry.delete(&room).unwrap_err();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(room.is_closed());
        assert!(registry.get_loaded(room.id()).is_none());
        assert!(registry.is_empty());

        // The row survived, so a later lookup brings back a fresh instance
        repo.fail_deletes.store(false, Ordering::SeqCst);
        let reloaded = registry.get_by_id(room.id()).unwrap();
        assert!(!Arc::ptr_eq(&room, &reloaded));
        assert!(!reloaded.is_closed());
    }

    #[test]
    fn test_delete_by_id_twice() {
        let repo = Arc::new(FlakyRepository::new());
        let registry = RoomRegistry::new(repo.clone());
        let room = registry.create("Shed", "", &CreateRoomConfig::new()).unwrap();

        registry.delete_by_id(room.id()).unwrap();
        assert!(room.is_closed());

        // Nothing loaded any more; the storage delete still runs and reports
        let err = registry.delete_by_id(room.id()).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(repo.deletes.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_set_room_password() {
        let registry = registry();
        let room = registry.create("Vault", "", &CreateRoomConfig::new()).unwrap();
        let before = room.version();

        let after = registry.set_room_password(room.id(), "hunter2").unwrap();
        assert_ne!(before, after);
        assert!(room.check_version(after));
        assert!(room.need_password());
    }

    #[test]
    fn test_listing_filters() {
        let registry = registry();
        let open = registry.create("Open", "", &CreateRoomConfig::new()).unwrap();
        let locked = registry.create("Locked", "pw", &CreateRoomConfig::new()).unwrap();
        let hidden = registry
            .create("Hidden", "", &CreateRoomConfig::new().with_hidden(true))
            .unwrap();

        let ids = |rooms: Vec<Arc<Room>>| rooms.iter().map(|r| r.id()).collect::<HashSet<_>>();

        assert_eq!(
            ids(registry.get_all()),
            HashSet::from([open.id(), locked.id(), hidden.id()])
        );
        assert_eq!(
            ids(registry.get_all_with_no_password_required()),
            HashSet::from([open.id(), hidden.id()])
        );
        assert_eq!(
            ids(registry.get_all_without_hidden()),
            HashSet::from([open.id(), locked.id()])
        );
    }

    #[test]
    fn test_listing_has_no_padding() {
        let registry = registry();
        for name in ["a", "b", "c"] {
            registry.create(name, "pw", &CreateRoomConfig::new()).unwrap();
        }

        assert_eq!(registry.get_all().len(), 3);
        assert!(registry.get_all_with_no_password_required().is_empty());
        assert_eq!(registry.get_all_without_hidden().len(), 3);
    }
}
