use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use kringle_core::{Room, RoomId};

use super::{Storage, StorageError};

/// In-memory storage implementation for testing and simulation
///
/// Rooms live in a `HashMap` behind `Arc<Mutex<>>`, so clones share state and
/// the revision check-and-set is atomic under the lock.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<HashMap<RoomId, Room>>>,
}

impl MemoryStorage {
    /// Create a new empty `MemoryStorage`
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rooms.
    pub fn room_count(&self) -> usize {
        self.lock().map(|rooms| rooms.len()).unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<RoomId, Room>>, StorageError> {
        self.inner.lock().map_err(|_| StorageError::Io("memory storage lock poisoned".to_string()))
    }
}

impl Storage for MemoryStorage {
    fn create_room(&self, room: &Room) -> Result<(), StorageError> {
        let mut rooms = self.lock()?;

        if rooms.contains_key(&room.id()) {
            return Err(StorageError::AlreadyExists(room.id()));
        }

        rooms.insert(room.id(), room.clone().with_revision(0));
        Ok(())
    }

    fn load_room(&self, room_id: RoomId) -> Result<Option<Room>, StorageError> {
        Ok(self.lock()?.get(&room_id).cloned())
    }

    fn replace_room(&self, room: &Room, expected_revision: u64) -> Result<u64, StorageError> {
        let mut rooms = self.lock()?;

        let stored = rooms.get_mut(&room.id()).ok_or(StorageError::NotFound(room.id()))?;
        if stored.revision() != expected_revision {
            return Err(StorageError::Conflict {
                expected: expected_revision,
                actual: stored.revision(),
            });
        }

        let next = expected_revision + 1;
        *stored = room.clone().with_revision(next);

        debug_assert_eq!(stored.revision(), next);
        Ok(next)
    }

    fn list_rooms(&self) -> Result<Vec<RoomId>, StorageError> {
        Ok(self.lock()?.keys().copied().collect())
    }
}
