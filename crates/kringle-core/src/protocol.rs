//! Client-side assignment protocol
//!
//! The three steps a participant's or host's client performs. Each reports
//! progress through a caller-supplied observer so a UI (or the background
//! runner in [`crate::background`]) can show what is happening during the
//! slow derivation.
//!
//! ```text
//! register:      Validating → Deriving → Done
//! prepare_start: Validating → Shuffling → Encrypting → Done
//! reveal:        Validating → Deriving → Decrypting → Done
//! ```
//!
//! # Secrets
//!
//! Private keys are dropped before each function returns. The giver →
//! receiver mapping exists only inside [`prepare_start`] and is never logged;
//! what leaves the function is one ciphertext per giver.

use std::collections::HashSet;

use kringle_crypto::{
    DerivationParams, KeySalt, Keypair, PublicKey, decrypt, derive_keypair, encrypt,
    max_plaintext_len,
};
use rand_core::CryptoRngCore;

use crate::{
    derangement::{self, MIN_PARTICIPANTS},
    error::{InputError, LifecycleError, ProtocolError},
    identity::{Password, RoomId, Username},
    messages::{LoginGrant, Registration, RosterEntry, SealedAssignment, StartBatch},
};

/// Progress label reported by the protocol operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Checking inputs
    Validating,
    /// Deriving the keypair from credentials
    Deriving,
    /// Drawing the derangement
    Shuffling,
    /// Sealing assignments
    Encrypting,
    /// Opening the participant's assignment
    Decrypting,
    /// Finished successfully
    Done,
}

impl Phase {
    /// Human-readable label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Validating => "validating",
            Self::Deriving => "deriving key",
            Self::Shuffling => "drawing assignments",
            Self::Encrypting => "sealing assignments",
            Self::Decrypting => "opening assignment",
            Self::Done => "done",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A participant's credentials for one room.
///
/// Shape-checked on construction; the password is zeroized on drop.
#[derive(Clone)]
pub struct Credentials {
    username: Username,
    password: Password,
    room_id: RoomId,
}

impl Credentials {
    /// Validate raw credentials.
    pub fn new(username: &str, password: &str, room_id: RoomId) -> Result<Self, InputError> {
        Ok(Self {
            username: Username::parse(username)?,
            password: Password::new(password)?,
            room_id,
        })
    }

    /// Sanitized username.
    pub fn username(&self) -> &Username {
        &self.username
    }

    /// Password text, for server-side verification.
    pub fn password(&self) -> &str {
        self.password.expose()
    }

    /// Room the credentials belong to.
    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    fn derive(&self, salt: &KeySalt, params: &DerivationParams) -> Result<Keypair, ProtocolError> {
        let room = self.room_id.to_string();
        Ok(derive_keypair(self.username.as_str(), self.password.expose(), &room, salt, params)?)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("room_id", &self.room_id)
            .finish_non_exhaustive()
    }
}

/// Derive the participant's keypair and return the public half.
///
/// # Errors
///
/// - `Crypto`: invalid parameters or exhausted derivation stream
pub fn register(
    credentials: &Credentials,
    key_salt: &KeySalt,
    params: &DerivationParams,
    mut observe: impl FnMut(Phase),
) -> Result<Registration, ProtocolError> {
    observe(Phase::Validating);
    params.validate()?;

    observe(Phase::Deriving);
    let public_key = credentials.derive(key_salt, params)?.public_key().to_pem()?;

    tracing::debug!(username = %credentials.username, "derived public key");

    observe(Phase::Done);
    Ok(Registration { username: credentials.username.clone(), public_key })
}

/// Draw the assignments and seal each receiver under its giver's key.
///
/// Fails closed: every key is parsed and every entry encrypted before the
/// batch is returned, so an error never yields a partial batch.
///
/// # Errors
///
/// - `Lifecycle(TooFewParticipants)`: fewer than two entries, checked before
///   any randomness is drawn
/// - `Lifecycle(IncompleteRegistration)`: an entry has no public key
/// - `InvalidRoster`: duplicate names, an unparsable key, or a key too small
///   to seal the longest name
/// - `Derangement`, `Crypto`: internal failures
pub fn prepare_start<R: CryptoRngCore>(
    roster: &[RosterEntry],
    rng: &mut R,
    mut observe: impl FnMut(Phase),
) -> Result<StartBatch, ProtocolError> {
    observe(Phase::Validating);

    if roster.len() < MIN_PARTICIPANTS {
        return Err(LifecycleError::TooFewParticipants {
            required: MIN_PARTICIPANTS,
            actual: roster.len(),
        }
        .into());
    }

    let longest = roster.iter().map(|entry| entry.username.as_str().len()).max().unwrap_or(0);
    let mut names = HashSet::with_capacity(roster.len());
    let mut keys = Vec::with_capacity(roster.len());
    for entry in roster {
        if !names.insert(&entry.username) {
            return Err(ProtocolError::InvalidRoster(format!("{} appears twice", entry.username)));
        }

        let pem = entry
            .public_key
            .as_deref()
            .ok_or_else(|| LifecycleError::IncompleteRegistration(entry.username.clone()))?;
        let key = PublicKey::from_pem(pem).map_err(|e| {
            ProtocolError::InvalidRoster(format!("public key of {}: {e}", entry.username))
        })?;
        if max_plaintext_len(&key) < longest {
            return Err(ProtocolError::InvalidRoster(format!(
                "public key of {} is too small ({} bits)",
                entry.username,
                key.modulus_bits()
            )));
        }
        keys.push(key);
    }

    observe(Phase::Shuffling);
    let indices: Vec<usize> = (0..roster.len()).collect();
    let assignment = derangement::assign(&indices, rng)?;

    observe(Phase::Encrypting);
    let mut assignments = Vec::with_capacity(roster.len());
    for (giver, receiver) in assignment {
        let plaintext = roster[receiver].username.as_str().as_bytes();
        let ciphertext = encrypt(plaintext, &keys[giver], rng)?;
        assignments.push(SealedAssignment { giver: roster[giver].username.clone(), ciphertext });
    }

    tracing::debug!(participants = roster.len(), "sealed start batch");

    observe(Phase::Done);
    Ok(StartBatch { assignments })
}

/// Re-derive the participant's key and open their assignment.
///
/// # Errors
///
/// - `InvalidCredentials`: the derived key cannot open the ciphertext
///   (wrong password, or a different derivation protocol)
/// - `Crypto`: invalid parameters or exhausted derivation stream
/// - `Internal`: the ciphertext opened but does not hold a username
pub fn reveal(
    credentials: &Credentials,
    grant: &LoginGrant,
    params: &DerivationParams,
    mut observe: impl FnMut(Phase),
) -> Result<Username, ProtocolError> {
    observe(Phase::Validating);
    params.validate()?;

    observe(Phase::Deriving);
    let keypair = credentials.derive(&grant.key_salt, params)?;

    observe(Phase::Decrypting);
    let plaintext = decrypt(&grant.ciphertext, &keypair)?;
    drop(keypair);

    let receiver = String::from_utf8(plaintext)
        .map_err(|_| ProtocolError::Internal("assignment is not valid UTF-8".to_string()))
        .and_then(|text| {
            Username::parse(&text)
                .map_err(|e| ProtocolError::Internal(format!("assignment is not a username: {e}")))
        })?;

    observe(Phase::Done);
    Ok(receiver)
}
