//! Server error types.

use kringle_core::{ErrorCategory, InputError, ProtocolError, RoomError, RoomId};
use kringle_crypto::CryptoError;
use thiserror::Error;

use crate::storage::StorageError;

/// Errors from room manager operations and the command-line client.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Credentials or names failed shape validation.
    ///
    /// Rejected before any verifier or storage work.
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Room model rejected the operation (authentication, lifecycle, batch
    /// validation). See `RoomError::category` for the split.
    #[error(transparent)]
    Room(#[from] RoomError),

    /// Room does not exist
    #[error("room not found: {0}")]
    RoomNotFound(RoomId),

    /// Another writer changed the room between load and write.
    ///
    /// Transient: reload and retry.
    #[error("room {0} was modified concurrently")]
    Conflict(RoomId),

    /// Storage backend failed.
    ///
    /// May be transient (I/O) or fatal (serialization).
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// Key or ciphertext handling failed outside the protocol steps
    #[error("cryptographic failure: {0}")]
    Crypto(#[from] CryptoError),

    /// Client-side protocol step failed
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration (database path, parameters)
    #[error("configuration error: {0}")]
    Config(String),
}

impl ServerError {
    /// Category used for propagation decisions and exit codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) | Self::RoomNotFound(_) | Self::Config(_) => {
                ErrorCategory::InputShape
            },
            Self::Room(err) => err.category(),
            Self::Protocol(err) => err.category(),
            Self::Conflict(_) => ErrorCategory::Lifecycle,
            Self::Crypto(CryptoError::DecryptionFailed) => ErrorCategory::Authentication,
            Self::Crypto(_) | Self::Storage(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this is a credential failure.
    pub fn is_authentication(&self) -> bool {
        self.category() == ErrorCategory::Authentication
    }
}
