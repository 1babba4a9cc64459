//! Room model and lifecycle
//!
//! A room is a plain value: every transition is a method that validates fully
//! before mutating, so a rejected call leaves the room untouched. Persistence
//! and atomicity (the revision check-and-set) belong to the storage layer.
//!
//! # Lifecycle
//!
//! ```text
//!   ┌──────┐   apply_start (≥ 2 participants, all registered)   ┌─────────┐
//!   │ Open │ ─────────────────────────────────────────────────▶ │ Started │
//!   └──────┘                                                    └─────────┘
//!   admit / set_public_key / remove                             grant
//! ```
//!
//! `Started` is terminal. A participant carries a ciphertext if and only if
//! the room has started.

use std::collections::HashSet;

use kringle_crypto::{Ciphertext, KeySalt, PasswordVerifier, PublicKey, max_plaintext_len};
use serde::{Deserialize, Serialize};

use crate::{
    derangement::MIN_PARTICIPANTS,
    error::{LifecycleError, RoomError},
    identity::{RoomId, RoomName, Username},
    messages::{LoginGrant, ParticipantSummary, RoomSummary, RosterEntry, StartBatch},
};

/// Lifecycle status of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomStatus {
    /// Accepting participants and registrations
    Open,
    /// Assignments sealed; terminal
    Started,
}

impl RoomStatus {
    /// Lowercase label for display.
    pub fn label(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Started => "started",
        }
    }
}

/// A member of a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    username: Username,
    verifier: PasswordVerifier,
    key_salt: KeySalt,
    public_key: Option<String>,
    ciphertext: Option<Ciphertext>,
}

impl Participant {
    /// New participant without a registered key.
    pub fn new(username: Username, verifier: PasswordVerifier, key_salt: KeySalt) -> Self {
        Self { username, verifier, key_salt, public_key: None, ciphertext: None }
    }

    /// Participant name.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Salt fixed at the first registration attempt.
    pub fn key_salt(&self) -> &KeySalt {
        &self.key_salt
    }

    /// Registered SPKI PEM, if any.
    pub fn public_key(&self) -> Option<&str> {
        self.public_key.as_deref()
    }

    /// Sealed assignment, present only once the room has started.
    pub fn ciphertext(&self) -> Option<&Ciphertext> {
        self.ciphertext.as_ref()
    }

    /// Check a password against the stored verifier.
    pub fn verify_password(&self, password: &str) -> bool {
        self.verifier.verify(password)
    }
}

/// A gift-exchange room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    id: RoomId,
    name: RoomName,
    host_verifier: PasswordVerifier,
    status: RoomStatus,
    participants: Vec<Participant>,
    created_at_secs: u64,
    revision: u64,
}

impl Room {
    /// New open room with no participants.
    pub fn new(
        id: RoomId,
        name: RoomName,
        host_verifier: PasswordVerifier,
        created_at_secs: u64,
    ) -> Self {
        Self {
            id,
            name,
            host_verifier,
            status: RoomStatus::Open,
            participants: Vec::new(),
            created_at_secs,
            revision: 0,
        }
    }

    /// Room identifier.
    pub fn id(&self) -> RoomId {
        self.id
    }

    /// Display name.
    pub fn name(&self) -> &RoomName {
        &self.name
    }

    /// Lifecycle status.
    pub fn status(&self) -> RoomStatus {
        self.status
    }

    /// Creation time, seconds since the Unix epoch.
    pub fn created_at_secs(&self) -> u64 {
        self.created_at_secs
    }

    /// Participants in join order.
    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// Look up a participant by name.
    pub fn participant(&self, username: &Username) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.username == username)
    }

    /// Storage revision this value was loaded at.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Same room stamped with a storage revision.
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Check the host password.
    pub fn authenticate_host(&self, password: &str) -> Result<(), RoomError> {
        if self.host_verifier.verify(password) {
            Ok(())
        } else {
            Err(RoomError::InvalidCredentials)
        }
    }

    /// Check a participant's credentials.
    ///
    /// An unknown username and a wrong password produce the same error.
    pub fn authenticate(
        &self,
        username: &Username,
        password: &str,
    ) -> Result<&Participant, RoomError> {
        self.participant(username)
            .filter(|p| p.verify_password(password))
            .ok_or(RoomError::InvalidCredentials)
    }

    /// Add a participant to an open room.
    pub fn admit(&mut self, participant: Participant, max: usize) -> Result<(), RoomError> {
        self.require_open()?;

        if self.participant(&participant.username).is_some() {
            return Err(RoomError::DuplicateUsername(participant.username));
        }
        if self.participants.len() >= max {
            return Err(RoomError::RoomFull { max });
        }

        let needed = participant.username.as_str().len();
        for existing in &self.participants {
            if let Some(Ok(key)) = existing.public_key.as_deref().map(PublicKey::from_pem)
                && max_plaintext_len(&key) < needed
            {
                return Err(RoomError::WeakPublicKey {
                    username: existing.username.clone(),
                    bits: key.modulus_bits(),
                });
            }
        }

        self.participants.push(participant);
        Ok(())
    }

    /// Record a participant's public key.
    ///
    /// Re-registering the same key is a no-op; a different key is rejected.
    /// Keys below `min_modulus_bits`, or too small to seal the longest name
    /// in the room, are `WeakPublicKey`. The key is stored in normalized PEM
    /// form.
    pub fn set_public_key(
        &mut self,
        username: &Username,
        pem: &str,
        min_modulus_bits: usize,
    ) -> Result<(), RoomError> {
        self.require_open()?;

        let key =
            PublicKey::from_pem(pem).map_err(|e| RoomError::InvalidPublicKey(e.to_string()))?;
        let longest =
            self.participants.iter().map(|p| p.username.as_str().len()).max().unwrap_or(0);
        if key.modulus_bits() < min_modulus_bits || max_plaintext_len(&key) < longest {
            return Err(RoomError::WeakPublicKey {
                username: username.clone(),
                bits: key.modulus_bits(),
            });
        }
        let normalized = key.to_pem().map_err(|e| RoomError::InvalidPublicKey(e.to_string()))?;

        let participant = self
            .participants
            .iter_mut()
            .find(|p| &p.username == username)
            .ok_or_else(|| RoomError::UnknownParticipant(username.clone()))?;

        match participant.public_key.as_deref() {
            None => {
                participant.public_key = Some(normalized);
                Ok(())
            },
            Some(existing) if existing == normalized => Ok(()),
            Some(_) => Err(RoomError::PublicKeyMismatch(username.clone())),
        }
    }

    /// Remove a participant from an open room.
    pub fn remove(&mut self, username: &Username) -> Result<Participant, RoomError> {
        self.require_open()?;

        let index = self
            .participants
            .iter()
            .position(|p| &p.username == username)
            .ok_or_else(|| RoomError::UnknownParticipant(username.clone()))?;

        Ok(self.participants.remove(index))
    }

    /// Names and registered keys, in join order.
    pub fn roster(&self) -> Vec<RosterEntry> {
        self.participants
            .iter()
            .map(|p| RosterEntry { username: p.username.clone(), public_key: p.public_key.clone() })
            .collect()
    }

    /// Seal the draw: store every ciphertext and move to `Started`.
    ///
    /// The batch must name every participant exactly once, and each
    /// ciphertext must be exactly as long as its giver's modulus. Everything
    /// is checked before anything is written.
    pub fn apply_start(
        &mut self,
        batch: &StartBatch,
        min_participants: usize,
    ) -> Result<(), RoomError> {
        self.require_open()?;

        let required = min_participants.max(MIN_PARTICIPANTS);
        if self.participants.len() < required {
            return Err(LifecycleError::TooFewParticipants {
                required,
                actual: self.participants.len(),
            }
            .into());
        }

        if let Some(unregistered) = self.participants.iter().find(|p| p.public_key.is_none()) {
            let username = unregistered.username.clone();
            return Err(LifecycleError::IncompleteRegistration(username).into());
        }

        if batch.assignments.len() != self.participants.len() {
            return Err(RoomError::BatchMismatch(format!(
                "{} assignments for {} participants",
                batch.assignments.len(),
                self.participants.len()
            )));
        }

        let mut seen = HashSet::with_capacity(batch.assignments.len());
        let mut sealed = Vec::with_capacity(batch.assignments.len());

        for entry in &batch.assignments {
            if !seen.insert(&entry.giver) {
                return Err(RoomError::BatchMismatch(format!("{} appears twice", entry.giver)));
            }

            let index = self
                .participants
                .iter()
                .position(|p| p.username == entry.giver)
                .ok_or_else(|| {
                    RoomError::BatchMismatch(format!("{} is not a participant", entry.giver))
                })?;

            let pem = self.participants[index].public_key.as_deref().unwrap_or_default();
            let key =
                PublicKey::from_pem(pem).map_err(|e| RoomError::InvalidPublicKey(e.to_string()))?;
            if entry.ciphertext.len() != key.modulus_len() {
                return Err(RoomError::InvalidCiphertext(entry.giver.clone()));
            }

            sealed.push((index, entry.ciphertext.clone()));
        }

        for (index, ciphertext) in sealed {
            self.participants[index].ciphertext = Some(ciphertext);
        }
        self.status = RoomStatus::Started;

        Ok(())
    }

    /// Salt and ciphertext for a participant of a started room.
    pub fn grant(&self, username: &Username) -> Result<LoginGrant, RoomError> {
        if self.status == RoomStatus::Open {
            return Err(LifecycleError::NotStarted.into());
        }

        let participant = self
            .participant(username)
            .ok_or_else(|| RoomError::UnknownParticipant(username.clone()))?;

        let ciphertext = participant.ciphertext.clone().ok_or(LifecycleError::NotStarted)?;

        Ok(LoginGrant { key_salt: participant.key_salt, ciphertext })
    }

    /// Public view of the room.
    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            created_at_secs: self.created_at_secs,
            participants: self
                .participants
                .iter()
                .map(|p| ParticipantSummary {
                    username: p.username.clone(),
                    registered: p.public_key.is_some(),
                })
                .collect(),
        }
    }

    fn require_open(&self) -> Result<(), RoomError> {
        match self.status {
            RoomStatus::Open => Ok(()),
            RoomStatus::Started => Err(LifecycleError::AlreadyStarted.into()),
        }
    }
}
