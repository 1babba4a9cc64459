//! Storage abstraction for Kringle rooms
//!
//! Trait-based abstraction for persisting rooms. The trait is synchronous (no
//! async) to keep the room manager a plain state machine.
//!
//! # Check-and-set
//!
//! Every stored room carries a revision. [`Storage::replace_room`] writes only
//! if the stored revision still equals the one the caller loaded, then bumps
//! it. Two concurrent starts therefore cannot both succeed: the second one
//! either sees a revision conflict or loads the already started room.

mod chaotic;
mod error;
mod memory;
mod redb;

pub use chaotic::ChaoticStorage;
pub use error::StorageError;
use kringle_core::{Room, RoomId};
pub use memory::MemoryStorage;

pub use self::redb::RedbStorage;

/// Storage abstraction for rooms
///
/// Must be Clone (shared by every manager handle), Send + Sync (thread-safe),
/// and synchronous (no async methods). Implementations share internal state
/// via Arc, so clones access the same underlying storage.
pub trait Storage: Clone + Send + Sync + 'static {
    /// Persist a new room at revision 0.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if a room with the same id is stored.
    fn create_room(&self, room: &Room) -> Result<(), StorageError>;

    /// Load a room, stamped with its stored revision.
    ///
    /// Returns `None` if the room doesn't exist.
    fn load_room(&self, room_id: RoomId) -> Result<Option<Room>, StorageError>;

    /// Overwrite a room if its stored revision equals `expected_revision`.
    ///
    /// # Invariants
    ///
    /// - Pre: the room exists
    /// - Post: stored revision is `expected_revision + 1`, which is returned
    /// - On `Conflict` nothing is written
    fn replace_room(&self, room: &Room, expected_revision: u64) -> Result<u64, StorageError>;

    /// List all room ids.
    ///
    /// Order is not guaranteed.
    fn list_rooms(&self) -> Result<Vec<RoomId>, StorageError>;
}
