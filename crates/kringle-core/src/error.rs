//! Error types for the Kringle protocol core.
//!
//! Every error maps onto one of four categories. Callers branch on the
//! category rather than on individual variants:
//!
//! - input shape: malformed or missing credentials, caught before any crypto
//! - authentication: always reported generically as invalid credentials
//! - lifecycle: operation not allowed in the room's current state
//! - internal: broken invariants or exhausted deterministic streams

use kringle_crypto::CryptoError;
use thiserror::Error;

use crate::{derangement::DerangementError, identity::Username};

/// Coarse classification shared by all Kringle errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Malformed input, rejected before any cryptographic work
    InputShape,
    /// Credential mismatch (verifier or decryption)
    Authentication,
    /// Operation not allowed in the room's current state
    Lifecycle,
    /// Broken invariant, exhaustion, storage or I/O failure
    Internal,
}

/// Credential or identifier failed shape validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    /// Username is empty after trimming
    #[error("username is empty")]
    EmptyUsername,

    /// Username has too many characters
    #[error("username is longer than {max} characters")]
    UsernameTooLong {
        /// Maximum number of characters
        max: usize,
    },

    /// Password has too few characters
    #[error("password must have at least {min} characters")]
    PasswordTooShort {
        /// Minimum number of characters
        min: usize,
    },

    /// Room name is empty or too long
    #[error("room name must have between 1 and {max} characters")]
    InvalidRoomName {
        /// Maximum number of characters
        max: usize,
    },

    /// Control characters are not allowed in names
    #[error("{field} contains control characters")]
    ControlCharacter {
        /// Which field was rejected
        field: &'static str,
    },

    /// Room identifier is not 32 hex digits
    #[error("invalid room id: {0}")]
    InvalidRoomId(String),
}

/// Operation rejected by the room lifecycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Start was already performed; the room is terminal
    #[error("room has already started")]
    AlreadyStarted,

    /// Assignments are not available before start
    #[error("room has not started yet")]
    NotStarted,

    /// Start needs more participants
    #[error("at least {required} participants are needed, room has {actual}")]
    TooFewParticipants {
        /// Minimum participants
        required: usize,
        /// Participants present
        actual: usize,
    },

    /// Start needs every participant to have registered a public key
    #[error("participant {0} has not registered a public key")]
    IncompleteRegistration(Username),
}

/// Errors from room model transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// Unknown participant or wrong password; deliberately indistinguishable
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Lifecycle rule violated
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Username already taken in this room
    #[error("username {0} is already taken")]
    DuplicateUsername(Username),

    /// Host referenced a participant that does not exist
    #[error("no participant named {0}")]
    UnknownParticipant(Username),

    /// Room is full
    #[error("room is full ({max} participants)")]
    RoomFull {
        /// Configured maximum
        max: usize,
    },

    /// A different public key is already registered for this participant
    #[error("a different public key is already registered for {0}")]
    PublicKeyMismatch(Username),

    /// Registered public key does not parse
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A public key too small to seal every participant's name
    #[error("public key of {username} is too small ({bits} bits)")]
    WeakPublicKey {
        /// Owner of the undersized key
        username: Username,
        /// Modulus size of the key
        bits: usize,
    },

    /// Start batch does not cover exactly the room's participants
    #[error("start batch mismatch: {0}")]
    BatchMismatch(String),

    /// Ciphertext in a start batch cannot belong to the giver's key
    #[error("ciphertext for {0} does not match the registered key size")]
    InvalidCiphertext(Username),
}

impl RoomError {
    /// Category used for propagation decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Lifecycle(_) => ErrorCategory::Lifecycle,
            Self::DuplicateUsername(_)
            | Self::UnknownParticipant(_)
            | Self::RoomFull { .. }
            | Self::PublicKeyMismatch(_)
            | Self::InvalidPublicKey(_)
            | Self::WeakPublicKey { .. }
            | Self::BatchMismatch(_)
            | Self::InvalidCiphertext(_) => ErrorCategory::InputShape,
        }
    }
}

/// Errors from the client-side assignment protocol.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Credentials or roster failed shape validation
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// Derived key could not open the assignment.
    ///
    /// Means a wrong password (or protocol mismatch), never reported in more
    /// detail than this.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operation not allowed in the room's current state
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Roster entry is unusable (duplicate name, bad public key)
    #[error("invalid roster: {0}")]
    InvalidRoster(String),

    /// Key derivation or encryption failed internally
    #[error("cryptographic failure: {0}")]
    Crypto(CryptoError),

    /// Derangement could not be produced
    #[error("assignment failed: {0}")]
    Derangement(#[from] DerangementError),

    /// Background worker died before producing a result
    #[error("internal error: {0}")]
    Internal(String),
}

impl ProtocolError {
    /// Category used for propagation decisions.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidInput(_) | Self::InvalidRoster(_) => ErrorCategory::InputShape,
            Self::InvalidCredentials => ErrorCategory::Authentication,
            Self::Lifecycle(_) => ErrorCategory::Lifecycle,
            Self::Crypto(_) | Self::Derangement(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl From<CryptoError> for ProtocolError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::DecryptionFailed => Self::InvalidCredentials,
            other => Self::Crypto(other),
        }
    }
}
