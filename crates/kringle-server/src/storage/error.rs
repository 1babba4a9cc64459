use kringle_core::RoomId;
use thiserror::Error;

/// Errors from storage backends.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// Stored revision moved since the room was loaded
    #[error("revision conflict: expected {expected}, found {actual}")]
    Conflict {
        /// Revision the caller loaded
        expected: u64,
        /// Revision currently stored
        actual: u64,
    },

    /// Room does not exist
    #[error("room not found: {0}")]
    NotFound(RoomId),

    /// Room id already taken
    #[error("room already exists: {0}")]
    AlreadyExists(RoomId),

    /// Backend I/O failure (may be transient)
    #[error("storage I/O error: {0}")]
    Io(String),

    /// Stored bytes could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl StorageError {
    /// Whether retrying the same operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Conflict { .. })
    }
}
