//! Room Manager
//!
//! Server side of the draw. Authenticates participants and the host, hands
//! out key salts, stores public keys, and accepts exactly one sealed batch
//! per room. It never sees a private key or the assignment mapping.
//!
//! Every mutating operation is load → validate on the [`Room`] value →
//! check-and-set write. A rejected transition never reaches storage.

use kringle_core::{
    Environment, LifecycleError, LoginGrant, Participant, Password, Room, RoomError, RoomId,
    RoomName, RoomStatus, RoomSummary, RosterEntry, StartBatch, Username,
};
use kringle_crypto::{DEFAULT_VERIFIER_ITERATIONS, DerivationParams, KeySalt, PasswordVerifier};

use crate::{
    error::ServerError,
    storage::{Storage, StorageError},
};

/// Configuration for a [`RoomManager`].
#[derive(Debug, Clone)]
pub struct RoomManagerConfig {
    /// Participants required before start (never below two)
    pub min_participants: usize,
    /// Participants a room accepts
    pub max_participants: usize,
    /// PBKDF2 iterations for new password verifiers
    pub verifier_iterations: u32,
    /// Smallest RSA modulus accepted at key registration
    pub min_key_bits: usize,
}

impl Default for RoomManagerConfig {
    fn default() -> Self {
        Self {
            min_participants: 2,
            max_participants: 100,
            verifier_iterations: DEFAULT_VERIFIER_ITERATIONS,
            min_key_bits: DerivationParams::PROTOCOL.modulus_bits,
        }
    }
}

/// Room lifecycle service over pluggable storage.
///
/// Generic over the environment (randomness, clock) and storage backend so the
/// same logic runs in production, in simulation, and under fault injection.
pub struct RoomManager<E: Environment, S: Storage> {
    env: E,
    storage: S,
    config: RoomManagerConfig,
}

impl<E: Environment, S: Storage> RoomManager<E, S> {
    /// Create a new `RoomManager`.
    pub fn new(env: E, storage: S, config: RoomManagerConfig) -> Self {
        Self { env, storage, config }
    }

    /// Storage backend (for inspection in tests and tooling).
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Active configuration.
    pub fn config(&self) -> &RoomManagerConfig {
        &self.config
    }

    /// Create an open room and return its id.
    pub fn create_room(&self, name: &str, host_password: &str) -> Result<RoomId, ServerError> {
        let name = RoomName::parse(name)?;
        let host_password = Password::new(host_password)?;

        let id = RoomId::new(self.env.random_u128());
        let verifier = self.new_verifier(host_password.expose());
        let room = Room::new(id, name, verifier, self.env.wall_clock_secs());

        self.storage.create_room(&room)?;

        tracing::info!(room_id = %id, "room created");
        Ok(id)
    }

    /// Key salt for a participant, joining them on first call.
    ///
    /// The first call for a username creates the participant with a fresh
    /// salt and a verifier for `password`; later calls must present the same
    /// password and always get the same salt back. New participants are only
    /// accepted while the room is open.
    pub fn issue_key_salt(
        &self,
        room_id: RoomId,
        username: &str,
        password: &str,
    ) -> Result<KeySalt, ServerError> {
        let username = Username::parse(username)?;
        let password = Password::new(password)?;
        let mut room = self.load(room_id)?;

        if room.participant(&username).is_some() {
            let participant = self.authenticate(&room, &username, password.expose())?;
            return Ok(*participant.key_salt());
        }

        let mut salt = [0u8; kringle_crypto::KEY_SALT_LEN];
        self.env.random_bytes(&mut salt);
        let key_salt = KeySalt::new(salt);

        let participant =
            Participant::new(username.clone(), self.new_verifier(password.expose()), key_salt);
        room.admit(participant, self.config.max_participants)?;
        self.commit(&room)?;

        tracing::info!(room_id = %room_id, %username, "participant joined");
        Ok(key_salt)
    }

    /// Register a participant's derived public key (SPKI PEM).
    ///
    /// Idempotent for the same key; a different key is `PublicKeyMismatch`.
    /// Keys smaller than [`RoomManagerConfig::min_key_bits`] are
    /// `WeakPublicKey`.
    pub fn register_public_key(
        &self,
        room_id: RoomId,
        username: &str,
        password: &str,
        public_key_pem: &str,
    ) -> Result<(), ServerError> {
        let username = Username::parse(username)?;
        let password = Password::new(password)?;
        let mut room = self.load(room_id)?;
        self.authenticate(&room, &username, password.expose())?;

        let before = room.clone();
        if let Err(err) = room.set_public_key(&username, public_key_pem, self.config.min_key_bits) {
            tracing::warn!(room_id = %room_id, %username, error = %err, "public key rejected");
            return Err(err.into());
        }
        if room != before {
            self.commit(&room)?;
            tracing::info!(room_id = %room_id, %username, "public key registered");
        }

        Ok(())
    }

    /// Host removes a participant from an open room.
    pub fn remove_participant(
        &self,
        room_id: RoomId,
        host_password: &str,
        username: &str,
    ) -> Result<(), ServerError> {
        let username = Username::parse(username)?;
        let mut room = self.load(room_id)?;
        self.authenticate_host(&room, host_password)?;

        room.remove(&username)?;
        self.commit(&room)?;

        tracing::info!(room_id = %room_id, %username, "participant removed");
        Ok(())
    }

    /// Participants and their public keys, for the host's client to seal the
    /// draw.
    pub fn roster(
        &self,
        room_id: RoomId,
        host_password: &str,
    ) -> Result<Vec<RosterEntry>, ServerError> {
        let room = self.load(room_id)?;
        self.authenticate_host(&room, host_password)?;
        Ok(room.roster())
    }

    /// Accept the sealed batch and start the room.
    ///
    /// Validation covers the whole batch before the single check-and-set
    /// write. A concurrent start that wins the race makes this one fail with
    /// `AlreadyStarted`.
    pub fn start(
        &self,
        room_id: RoomId,
        host_password: &str,
        batch: &StartBatch,
    ) -> Result<(), ServerError> {
        let mut room = self.load(room_id)?;
        self.authenticate_host(&room, host_password)?;

        if let Err(err) = room.apply_start(batch, self.config.min_participants) {
            tracing::warn!(room_id = %room_id, error = %err, "start rejected");
            return Err(err.into());
        }

        match self.commit(&room) {
            Ok(()) => {},
            Err(ServerError::Conflict(_)) => {
                let current = self.load(room_id)?;
                if current.status() == RoomStatus::Started {
                    tracing::warn!(room_id = %room_id, "lost start race");
                    return Err(RoomError::from(LifecycleError::AlreadyStarted).into());
                }
                return Err(ServerError::Conflict(room_id));
            },
            Err(err) => return Err(err),
        }

        tracing::info!(room_id = %room_id, participants = batch.assignments.len(), "room started");
        Ok(())
    }

    /// A participant's key salt and sealed assignment.
    ///
    /// Before start this is `NotStarted`, an expected outcome.
    pub fn login(
        &self,
        room_id: RoomId,
        username: &str,
        password: &str,
    ) -> Result<LoginGrant, ServerError> {
        let username = Username::parse(username)?;
        let password = Password::new(password)?;
        let room = self.load(room_id)?;
        self.authenticate(&room, &username, password.expose())?;

        Ok(room.grant(&username)?)
    }

    /// Public view of a room.
    pub fn summary(&self, room_id: RoomId) -> Result<RoomSummary, ServerError> {
        Ok(self.load(room_id)?.summary())
    }

    /// Ids of every stored room.
    pub fn list_rooms(&self) -> Result<Vec<RoomId>, ServerError> {
        Ok(self.storage.list_rooms()?)
    }

    fn load(&self, room_id: RoomId) -> Result<Room, ServerError> {
        self.storage.load_room(room_id)?.ok_or(ServerError::RoomNotFound(room_id))
    }

    fn commit(&self, room: &Room) -> Result<(), ServerError> {
        match self.storage.replace_room(room, room.revision()) {
            Ok(_) => Ok(()),
            Err(StorageError::Conflict { expected, actual }) => {
                tracing::debug!(room_id = %room.id(), expected, actual, "revision conflict");
                Err(ServerError::Conflict(room.id()))
            },
            Err(err) => Err(err.into()),
        }
    }

    fn authenticate<'r>(
        &self,
        room: &'r Room,
        username: &Username,
        password: &str,
    ) -> Result<&'r Participant, ServerError> {
        room.authenticate(username, password).map_err(|err| {
            tracing::warn!(room_id = %room.id(), "participant authentication failed");
            err.into()
        })
    }

    fn authenticate_host(&self, room: &Room, password: &str) -> Result<(), ServerError> {
        room.authenticate_host(password).map_err(|err| {
            tracing::warn!(room_id = %room.id(), "host authentication failed");
            err.into()
        })
    }

    fn new_verifier(&self, password: &str) -> PasswordVerifier {
        let mut salt = [0u8; 16];
        self.env.random_bytes(&mut salt);
        PasswordVerifier::create(password, salt, self.config.verifier_iterations)
    }
}

impl<E: Environment, S: Storage> std::fmt::Debug for RoomManager<E, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomManager").field("config", &self.config).finish_non_exhaustive()
    }
}
