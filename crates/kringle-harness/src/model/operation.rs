//! Operations for model-based testing.
//!
//! Operations represent every action a client or host can take against a
//! room. They are generated randomly (proptest or a fuzzer) and applied to
//! both the model and the real implementation.

use arbitrary::Arbitrary;
use kringle_core::ErrorCategory;

/// Client identifier (0-indexed).
pub type ClientId = u8;

/// Room identifier (mapped to a real `RoomId` by the driver).
pub type ModelRoomId = u8;

/// Operations that can be applied to the system.
#[derive(Debug, Clone, Arbitrary)]
pub enum Operation {
    /// Host creates a room.
    CreateRoom {
        /// Room to create.
        room_id: ModelRoomId,
    },

    /// Client asks for its key salt, joining on first call.
    Join {
        /// Client joining.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
    },

    /// Client registers its public key.
    Register {
        /// Client registering.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
    },

    /// Host removes a client.
    Remove {
        /// Client being removed.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
    },

    /// Host seals the draw with the current roster.
    Start {
        /// Room to start.
        room_id: ModelRoomId,
    },

    /// Someone tries to start with the wrong host password.
    WrongHostStart {
        /// Room to start.
        room_id: ModelRoomId,
    },

    /// Client logs in to fetch its sealed assignment.
    Login {
        /// Client logging in.
        client_id: ClientId,
        /// Target room.
        room_id: ModelRoomId,
        /// Whether the client uses its own password.
        correct_password: bool,
    },

    /// Advance the virtual clock.
    AdvanceTime {
        /// Seconds to advance.
        secs: u16,
    },
}

/// Result of applying an operation.
///
/// Used to compare model and real system behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationResult {
    /// Operation succeeded.
    Ok,

    /// Operation failed with expected error.
    Error(OperationError),
}

/// Expected errors that can occur during operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationError {
    /// Client id out of range.
    InvalidClient,

    /// Model room id already mapped to a room.
    RoomAlreadyExists,

    /// Room does not exist.
    RoomNotFound,

    /// Unknown user or wrong password.
    InvalidCredentials,

    /// Host named a client that is not in the room.
    UnknownParticipant,

    /// Room is terminal.
    AlreadyStarted,

    /// No assignment yet.
    NotStarted,

    /// Start with fewer than two participants.
    TooFewParticipants,

    /// Start while someone has no key.
    IncompleteRegistration,

    /// Anything the model does not predict.
    Unexpected(String),
}

impl OperationError {
    /// Category the real implementation reports for this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidClient
            | Self::RoomAlreadyExists
            | Self::RoomNotFound
            | Self::UnknownParticipant => ErrorCategory::InputShape,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::AlreadyStarted
            | Self::NotStarted
            | Self::TooFewParticipants
            | Self::IncompleteRegistration => ErrorCategory::Lifecycle,
            Self::Unexpected(_) => ErrorCategory::Internal,
        }
    }
}

impl OperationResult {
    /// Check if operation succeeded.
    pub fn is_ok(&self) -> bool {
        matches!(self, OperationResult::Ok)
    }

    /// Check if operation failed.
    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}
