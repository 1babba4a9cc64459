//! Background execution of the protocol operations
//!
//! Key derivation takes seconds of CPU, so it runs on tokio's blocking pool
//! instead of an async worker. Progress is published on a `watch` channel;
//! the latest [`Phase`] is always available without waiting.
//!
//! Dropping a [`BackgroundTask`] does not interrupt the computation. The
//! worker runs to completion and its result is discarded.

use kringle_crypto::{DerivationParams, KeySalt};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tokio::{sync::watch, task::JoinHandle};

use crate::{
    error::ProtocolError,
    identity::Username,
    messages::{LoginGrant, Registration, RosterEntry, StartBatch},
    protocol::{self, Credentials, Phase},
};

/// A protocol operation running on the blocking pool.
#[derive(Debug)]
pub struct BackgroundTask<T> {
    phase: watch::Receiver<Phase>,
    handle: JoinHandle<Result<T, ProtocolError>>,
}

impl<T: Send + 'static> BackgroundTask<T> {
    fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(&mut dyn FnMut(Phase)) -> Result<T, ProtocolError> + Send + 'static,
    {
        let (tx, rx) = watch::channel(Phase::Validating);

        let handle = tokio::task::spawn_blocking(move || {
            let mut observe = |phase: Phase| {
                tx.send_replace(phase);
            };
            work(&mut observe)
        });

        Self { phase: rx, handle }
    }

    /// Most recently reported phase.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// A receiver that is notified on every phase change.
    pub fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.clone()
    }

    /// Whether the worker has returned.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the result.
    ///
    /// A worker that panicked surfaces as `ProtocolError::Internal`.
    pub async fn join(self) -> Result<T, ProtocolError> {
        self.handle.await.map_err(|e| ProtocolError::Internal(format!("worker failed: {e}")))?
    }
}

/// Run [`protocol::register`] in the background.
///
/// Must be called from within a tokio runtime.
pub fn spawn_register(
    credentials: Credentials,
    key_salt: KeySalt,
    params: DerivationParams,
) -> BackgroundTask<Registration> {
    BackgroundTask::spawn(move |observe| {
        protocol::register(&credentials, &key_salt, &params, observe)
    })
}

/// Run [`protocol::prepare_start`] in the background.
///
/// `seed` keys the ChaCha20 RNG used for both the shuffle and the OAEP
/// padding; it must come from a cryptographically secure source.
pub fn spawn_prepare_start(roster: Vec<RosterEntry>, seed: [u8; 32]) -> BackgroundTask<StartBatch> {
    BackgroundTask::spawn(move |observe| {
        let mut rng = ChaCha20Rng::from_seed(seed);
        protocol::prepare_start(&roster, &mut rng, observe)
    })
}

/// Run [`protocol::reveal`] in the background.
pub fn spawn_reveal(
    credentials: Credentials,
    grant: LoginGrant,
    params: DerivationParams,
) -> BackgroundTask<Username> {
    BackgroundTask::spawn(move |observe| protocol::reveal(&credentials, &grant, &params, observe))
}
