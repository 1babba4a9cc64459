//! Kringle protocol core
//!
//! Room lifecycle, the derangement generator and the client-side assignment
//! protocol. No I/O: storage and transport live in `kringle-server`, and all
//! randomness and time come in through [`Environment`] or an explicit RNG.
//!
//! # Draw Flow
//!
//! ```text
//!  participant                 room (server)                 host
//!  ───────────                 ─────────────                 ────
//!  issue salt ───────────────▶ Participant { key_salt }
//!  register() → public key ──▶ set_public_key
//!                                                   ◀─────── roster()
//!                                                   prepare_start():
//!                                                     derangement + OAEP
//!                              apply_start(batch) ◀─────── StartBatch
//!  login ◀─────────────────── grant() → LoginGrant
//!  reveal() → receiver
//! ```
//!
//! The server only ever holds public keys and ciphertexts. The mapping exists
//! on the host's stack for the duration of [`protocol::prepare_start`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod background;
pub mod derangement;
pub mod env;
pub mod error;
pub mod identity;
pub mod messages;
pub mod protocol;
pub mod room;

pub use background::{BackgroundTask, spawn_prepare_start, spawn_register, spawn_reveal};
pub use derangement::{Assignment, DerangementError, MAX_ATTEMPTS, assign};
pub use env::Environment;
pub use error::{ErrorCategory, InputError, LifecycleError, ProtocolError, RoomError};
pub use identity::{Password, RoomId, RoomName, Username};
pub use messages::{
    LoginGrant, ParticipantSummary, Registration, RoomSummary, RosterEntry, SealedAssignment,
    StartBatch,
};
pub use protocol::{Credentials, Phase, prepare_start, register, reveal};
pub use room::{Participant, Room, RoomStatus};
