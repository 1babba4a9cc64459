//! Deterministic Environment implementation for simulation.
//!
//! `SimEnv` draws every random byte from a seeded ChaCha20 stream and reads
//! time from a virtual clock that only moves when a test advances it. Two
//! environments built from the same seed produce the same room ids, salts
//! and draw seeds in the same order.

use std::sync::{
    Arc, Mutex, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use kringle_core::Environment;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;

/// Virtual clock start (2023-11-14T22:13:20Z).
pub const SIM_EPOCH_SECS: u64 = 1_700_000_000;

/// Seeded environment with a virtual clock.
///
/// Clones share the RNG stream and the clock, so a manager and the test
/// driving it observe the same time.
#[derive(Clone)]
pub struct SimEnv {
    rng: Arc<Mutex<ChaCha20Rng>>,
    clock_secs: Arc<AtomicU64>,
}

impl SimEnv {
    /// Environment seeded from `seed`.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(seed))),
            clock_secs: Arc::new(AtomicU64::new(SIM_EPOCH_SECS)),
        }
    }

    /// Move the virtual clock forward.
    pub fn advance_secs(&self, secs: u64) {
        self.clock_secs.fetch_add(secs, Ordering::SeqCst);
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::with_seed(0)
    }
}

impl Environment for SimEnv {
    fn random_bytes(&self, buffer: &mut [u8]) {
        // A panicking test thread must not wedge every later draw.
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        rng.fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        self.clock_secs.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for SimEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimEnv")
            .field("clock_secs", &self.wall_clock_secs())
            .finish_non_exhaustive()
    }
}
