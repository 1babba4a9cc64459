//! Chaotic storage wrapper for fault injection testing
//!
//! Storage wrapper that randomly fails operations to test error handling.
//! The room manager must never leave a half-applied transition behind: a
//! failed write has to leave the previous room intact.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use kringle_core::{Room, RoomId};

use super::{Storage, StorageError};

/// Chaotic storage wrapper that randomly injects failures
///
/// Delegates to an underlying storage implementation but fails operations
/// with a configured probability. The RNG is a seeded LCG so chaos runs are
/// reproducible.
#[derive(Clone)]
pub struct ChaoticStorage<S: Storage> {
    inner: S,
    /// Failure rate (0.0 = never fail, 1.0 = always fail)
    failure_rate: f64,
    /// Only inject failures into writes (create, replace)
    writes_only: bool,
    rng: Arc<Mutex<ChaoticRng>>,
    operation_count: Arc<AtomicUsize>,
    injected_failures: Arc<AtomicUsize>,
}

/// Linear congruential generator, good enough for fault injection.
struct ChaoticRng {
    state: u64,
}

impl ChaoticRng {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next value in [0.0, 1.0)
    fn next_unit(&mut self) -> f64 {
        // Numerical Recipes constants
        const A: u64 = 1_664_525;
        const C: u64 = 1_013_904_223;
        const M: u64 = 1u64 << 32;

        self.state = (A.wrapping_mul(self.state).wrapping_add(C)) % M;
        (self.state as f64) / (M as f64)
    }
}

impl<S: Storage> ChaoticStorage<S> {
    /// Wrap `inner`, failing each operation with probability `failure_rate`.
    ///
    /// The rate is clamped to [0.0, 1.0].
    pub fn new(inner: S, failure_rate: f64) -> Self {
        Self::with_seed(inner, failure_rate, 0x1234_5678_9ABC_DEF0)
    }

    /// Create with explicit seed for reproducible chaos
    pub fn with_seed(inner: S, failure_rate: f64, seed: u64) -> Self {
        Self {
            inner,
            failure_rate: failure_rate.clamp(0.0, 1.0),
            writes_only: false,
            rng: Arc::new(Mutex::new(ChaoticRng::new(seed))),
            operation_count: Arc::new(AtomicUsize::new(0)),
            injected_failures: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Leave reads alone and only fail `create_room` / `replace_room`.
    #[must_use]
    pub fn writes_only(mut self) -> Self {
        self.writes_only = true;
        self
    }

    /// Underlying storage (for checking invariants after chaos).
    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Total number of storage operations attempted.
    pub fn operation_count(&self) -> usize {
        self.operation_count.load(Ordering::Relaxed)
    }

    /// Number of operations that were failed on purpose.
    pub fn injected_failures(&self) -> usize {
        self.injected_failures.load(Ordering::Relaxed)
    }

    fn check(&self, is_write: bool) -> Result<(), StorageError> {
        self.operation_count.fetch_add(1, Ordering::Relaxed);

        if self.writes_only && !is_write {
            return Ok(());
        }

        let roll = self.rng.lock().map(|mut rng| rng.next_unit()).unwrap_or(0.0);
        if roll < self.failure_rate {
            self.injected_failures.fetch_add(1, Ordering::Relaxed);
            return Err(StorageError::Io("chaotic failure injection".to_string()));
        }
        Ok(())
    }
}

impl<S: Storage> Storage for ChaoticStorage<S> {
    fn create_room(&self, room: &Room) -> Result<(), StorageError> {
        self.check(true)?;
        self.inner.create_room(room)
    }

    fn load_room(&self, room_id: RoomId) -> Result<Option<Room>, StorageError> {
        self.check(false)?;
        self.inner.load_room(room_id)
    }

    fn replace_room(&self, room: &Room, expected_revision: u64) -> Result<u64, StorageError> {
        self.check(true)?;
        self.inner.replace_room(room, expected_revision)
    }

    fn list_rooms(&self) -> Result<Vec<RoomId>, StorageError> {
        self.check(false)?;
        self.inner.list_rooms()
    }
}
