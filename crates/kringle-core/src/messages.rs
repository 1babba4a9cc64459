//! Values exchanged between the client protocol and the room manager
//!
//! None of these carry secrets: public keys, ciphertexts and key salts are
//! all safe to store and log.

use kringle_crypto::{Ciphertext, KeySalt};
use serde::{Deserialize, Serialize};

use crate::{
    identity::{RoomId, RoomName, Username},
    room::RoomStatus,
};

/// Result of the registration step, submitted to the room manager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registration {
    /// Participant the key belongs to
    pub username: Username,
    /// SPKI PEM of the derived public key
    pub public_key: String,
}

/// One participant as seen by the host when preparing the draw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterEntry {
    /// Participant name
    pub username: Username,
    /// Registered SPKI PEM, `None` until the participant has registered
    pub public_key: Option<String>,
}

/// A receiver name encrypted to the giver's public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedAssignment {
    /// Participant who can open this ciphertext
    pub giver: Username,
    /// OAEP ciphertext of the receiver's username
    pub ciphertext: Ciphertext,
}

/// Complete set of sealed assignments for one draw.
///
/// Contains exactly one entry per participant. Nothing in it reveals the
/// mapping to anyone but the individual givers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartBatch {
    /// One entry per participant, in roster order
    pub assignments: Vec<SealedAssignment>,
}

/// What a participant receives on login to a started room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginGrant {
    /// Salt needed to re-derive the keypair
    pub key_salt: KeySalt,
    /// The participant's sealed assignment
    pub ciphertext: Ciphertext,
}

/// Public view of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    /// Room identifier
    pub id: RoomId,
    /// Display name
    pub name: RoomName,
    /// Lifecycle status
    pub status: RoomStatus,
    /// Creation time, seconds since the Unix epoch
    pub created_at_secs: u64,
    /// Participants in join order
    pub participants: Vec<ParticipantSummary>,
}

/// Public view of one participant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantSummary {
    /// Participant name
    pub username: Username,
    /// Whether a public key has been registered
    pub registered: bool,
}
