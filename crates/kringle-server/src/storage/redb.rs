//! Redb-backed durable storage implementation.
//!
//! Uses Redb's ACID transactions with Copy-on-Write for crash safety. The
//! revision check and the write of [`Storage::replace_room`] happen inside a
//! single write transaction, so the check-and-set is atomic across handles.

use std::{path::Path, sync::Arc};

use kringle_core::{Room, RoomId};
use redb::{Database, ReadableTable, TableDefinition};

use super::{Storage, StorageError};

/// Table: rooms
/// Key: room_id as big-endian bytes [16 bytes]
/// Value: CBOR-encoded Room (revision included)
const ROOMS: TableDefinition<&[u8], &[u8]> = TableDefinition::new("rooms");

/// Durable storage backed by Redb.
///
/// Thread-safe through Redb's internal locking. Clone is cheap (Arc).
#[derive(Clone)]
pub struct RedbStorage {
    db: Arc<Database>,
}

impl RedbStorage {
    /// Open or create a Redb database at the given path.
    ///
    /// Creates the ROOMS table if it doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the database cannot be opened or created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db = Database::create(path.as_ref()).map_err(|e| StorageError::Io(e.to_string()))?;

        let txn = db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;
        {
            let _ = txn.open_table(ROOMS).map_err(|e| StorageError::Io(e.to_string()))?;
        }
        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(Self { db: Arc::new(db) })
    }
}

impl Storage for RedbStorage {
    fn create_room(&self, room: &Room) -> Result<(), StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        {
            let mut table = txn.open_table(ROOMS).map_err(|e| StorageError::Io(e.to_string()))?;

            let key = room.id().to_be_bytes();
            let exists =
                table.get(key.as_slice()).map_err(|e| StorageError::Io(e.to_string()))?.is_some();
            if exists {
                return Err(StorageError::AlreadyExists(room.id()));
            }

            let bytes = encode_room(&room.clone().with_revision(0))?;
            table
                .insert(key.as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
        }

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(())
    }

    fn load_room(&self, room_id: RoomId) -> Result<Option<Room>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(ROOMS).map_err(|e| StorageError::Io(e.to_string()))?;

        let key = room_id.to_be_bytes();
        match table.get(key.as_slice()).map_err(|e| StorageError::Io(e.to_string()))? {
            Some(value) => decode_room(value.value()).map(Some),
            None => Ok(None),
        }
    }

    fn replace_room(&self, room: &Room, expected_revision: u64) -> Result<u64, StorageError> {
        let txn = self.db.begin_write().map_err(|e| StorageError::Io(e.to_string()))?;

        let next = {
            let mut table = txn.open_table(ROOMS).map_err(|e| StorageError::Io(e.to_string()))?;
            let key = room.id().to_be_bytes();

            let stored = match table.get(key.as_slice()).map_err(|e| StorageError::Io(e.to_string()))? {
                Some(value) => decode_room(value.value())?,
                None => return Err(StorageError::NotFound(room.id())),
            };

            if stored.revision() != expected_revision {
                return Err(StorageError::Conflict {
                    expected: expected_revision,
                    actual: stored.revision(),
                });
            }

            let next = expected_revision + 1;
            let bytes = encode_room(&room.clone().with_revision(next))?;
            table
                .insert(key.as_slice(), bytes.as_slice())
                .map_err(|e| StorageError::Io(e.to_string()))?;
            next
        };

        txn.commit().map_err(|e| StorageError::Io(e.to_string()))?;

        Ok(next)
    }

    fn list_rooms(&self) -> Result<Vec<RoomId>, StorageError> {
        let txn = self.db.begin_read().map_err(|e| StorageError::Io(e.to_string()))?;
        let table = txn.open_table(ROOMS).map_err(|e| StorageError::Io(e.to_string()))?;

        let mut rooms = Vec::new();
        for result in table.iter().map_err(|e| StorageError::Io(e.to_string()))? {
            let (key, _) = result.map_err(|e| StorageError::Io(e.to_string()))?;
            rooms.push(decode_room_key(key.value())?);
        }

        Ok(rooms)
    }
}

fn encode_room(room: &Room) -> Result<Vec<u8>, StorageError> {
    let mut bytes = Vec::new();
    ciborium::into_writer(room, &mut bytes)
        .map_err(|e| StorageError::Serialization(e.to_string()))?;
    Ok(bytes)
}

fn decode_room(bytes: &[u8]) -> Result<Room, StorageError> {
    ciborium::from_reader(bytes).map_err(|e| StorageError::Serialization(e.to_string()))
}

fn decode_room_key(key: &[u8]) -> Result<RoomId, StorageError> {
    let bytes: [u8; 16] = key
        .try_into()
        .map_err(|_| StorageError::Serialization(format!("room key has {} bytes", key.len())))?;
    Ok(RoomId::new(u128::from_be_bytes(bytes)))
}
