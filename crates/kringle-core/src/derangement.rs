//! Derangement generator
//!
//! Produces a uniformly random giver → receiver bijection in which nobody
//! draws themself. Rejection sampling over Fisher-Yates shuffles: every
//! permutation is equally likely per attempt, so conditioning on "no fixed
//! point" is uniform over derangements. About 1/e of permutations qualify, so
//! the expected number of attempts is close to e.

use std::collections::HashSet;
use std::hash::Hash;

use rand::{Rng, RngCore};
use thiserror::Error;

/// Attempts before giving up.
///
/// The chance a correct shuffle needs this many is below `(1 - 1/3)^10000`;
/// hitting the cap means the shuffle or the RNG is broken.
pub const MAX_ATTEMPTS: usize = 10_000;

/// Smallest group a derangement exists for
pub const MIN_PARTICIPANTS: usize = 2;

/// Errors from derangement generation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DerangementError {
    /// Fewer than two participants
    #[error("a derangement needs at least {MIN_PARTICIPANTS} participants, got {count}")]
    TooFewParticipants {
        /// Participants supplied
        count: usize,
    },

    /// The same identity appears twice
    #[error("participant list contains duplicates")]
    DuplicateParticipant,

    /// No fixed-point-free permutation within the attempt cap
    #[error("no derangement found after {attempts} attempts")]
    Unreachable {
        /// Attempts made
        attempts: usize,
    },
}

/// A giver → receiver mapping with no fixed point.
///
/// This is the plaintext secret of a draw. It has no serialization and its
/// `Debug` output only shows the size.
pub struct Assignment<T> {
    pairs: Vec<(T, T)>,
}

impl<T: PartialEq> Assignment<T> {
    /// `(giver, receiver)` pairs, givers in input order.
    pub fn pairs(&self) -> &[(T, T)] {
        &self.pairs
    }

    /// Receiver assigned to `giver`.
    pub fn receiver_of(&self, giver: &T) -> Option<&T> {
        self.pairs.iter().find(|(g, _)| g == giver).map(|(_, r)| r)
    }

    /// Number of participants.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Always false for a successfully generated assignment.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl<T> IntoIterator for Assignment<T> {
    type Item = (T, T);
    type IntoIter = std::vec::IntoIter<(T, T)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.into_iter()
    }
}

impl<T> std::fmt::Debug for Assignment<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Assignment").field("len", &self.pairs.len()).finish_non_exhaustive()
    }
}

/// Assign every participant a receiver other than themself.
///
/// # Errors
///
/// - `TooFewParticipants`: fewer than two entries
/// - `DuplicateParticipant`: an identity appears twice
/// - `Unreachable`: attempt cap exceeded
pub fn assign<T, R>(participants: &[T], rng: &mut R) -> Result<Assignment<T>, DerangementError>
where
    T: Clone + Eq + Hash,
    R: RngCore + ?Sized,
{
    let mut seen = HashSet::with_capacity(participants.len());
    if !participants.iter().all(|p| seen.insert(p)) {
        return Err(DerangementError::DuplicateParticipant);
    }

    let permutation = derange_indices(participants.len(), rng)?;

    let pairs = permutation
        .iter()
        .enumerate()
        .map(|(giver, &receiver)| (participants[giver].clone(), participants[receiver].clone()))
        .collect();

    Ok(Assignment { pairs })
}

/// Random permutation of `0..n` with `perm[i] != i` for every `i`.
pub fn derange_indices<R: RngCore + ?Sized>(
    n: usize,
    rng: &mut R,
) -> Result<Vec<usize>, DerangementError> {
    if n < MIN_PARTICIPANTS {
        return Err(DerangementError::TooFewParticipants { count: n });
    }

    let mut permutation: Vec<usize> = Vec::with_capacity(n);

    for _ in 0..MAX_ATTEMPTS {
        permutation.clear();
        permutation.extend(0..n);
        shuffle(&mut permutation, rng);

        if is_derangement(&permutation) {
            return Ok(permutation);
        }
    }

    Err(DerangementError::Unreachable { attempts: MAX_ATTEMPTS })
}

/// In-place Fisher-Yates: for `i` from last down to 1, swap with a uniform
/// `j` in `[0, i]`.
fn shuffle<T, R: RngCore + ?Sized>(items: &mut [T], rng: &mut R) {
    for i in (1..items.len()).rev() {
        let j = rng.gen_range(0..=i);
        items.swap(i, j);
    }
}

fn is_derangement(permutation: &[usize]) -> bool {
    permutation.iter().enumerate().all(|(i, &p)| i != p)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    /// RNG that always returns zero.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn no_fixed_points_for_three_over_ten_thousand_trials() {
        let mut rng = ChaCha8Rng::seed_from_u64(0xC0FFEE);
        let names = ["Alice", "Bob", "Carol"];

        for _ in 0..10_000 {
            let assignment = assign(&names, &mut rng).unwrap();
            for (giver, receiver) in assignment.pairs() {
                assert_ne!(giver, receiver);
            }
        }
    }

    #[test]
    fn result_is_a_bijection() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let names: Vec<String> = (0..25).map(|i| format!("p{i}")).collect();

        let assignment = assign(&names, &mut rng).unwrap();

        let givers: HashSet<_> = assignment.pairs().iter().map(|(g, _)| g).collect();
        let receivers: HashSet<_> = assignment.pairs().iter().map(|(_, r)| r).collect();
        assert_eq!(givers.len(), names.len());
        assert_eq!(receivers.len(), names.len());
    }

    #[test]
    fn givers_keep_input_order() {
        let mut rng = ChaCha8Rng::seed_from_u64(2);
        let names = ["d", "a", "c", "b"];

        let assignment = assign(&names, &mut rng).unwrap();
        let givers: Vec<_> = assignment.pairs().iter().map(|(g, _)| *g).collect();
        assert_eq!(givers, names);
    }

    #[test]
    fn two_participants_swap() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let assignment = assign(&["Alice", "Bob"], &mut rng).unwrap();

        assert_eq!(assignment.receiver_of(&"Alice"), Some(&"Bob"));
        assert_eq!(assignment.receiver_of(&"Bob"), Some(&"Alice"));
        assert_eq!(assignment.receiver_of(&"Mallory"), None);
    }

    #[test]
    fn uniform_over_three() {
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();

        for _ in 0..6_000 {
            *counts.entry(derange_indices(3, &mut rng).unwrap()).or_default() += 1;
        }

        // [1, 2, 0] and [2, 0, 1]
        assert_eq!(counts.len(), 2);
        for count in counts.values() {
            assert!((2_700..=3_300).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn uniform_over_four() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut counts: HashMap<Vec<usize>, usize> = HashMap::new();

        for _ in 0..18_000 {
            *counts.entry(derange_indices(4, &mut rng).unwrap()).or_default() += 1;
        }

        assert_eq!(counts.len(), 9);
        for count in counts.values() {
            assert!((1_700..=2_300).contains(count), "skewed count {count}");
        }
    }

    #[test]
    fn too_few_participants() {
        let mut rng = ChaCha8Rng::seed_from_u64(6);

        assert_eq!(
            assign::<&str, _>(&[], &mut rng).unwrap_err(),
            DerangementError::TooFewParticipants { count: 0 }
        );
        assert_eq!(
            assign(&["solo"], &mut rng).unwrap_err(),
            DerangementError::TooFewParticipants { count: 1 }
        );
    }

    #[test]
    fn duplicates_are_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let result = assign(&["Alice", "Bob", "Alice"], &mut rng);
        assert_eq!(result.unwrap_err(), DerangementError::DuplicateParticipant);
    }

    #[test]
    fn constant_rng_gives_a_rotation() {
        // j = 0 at every step rotates the identity left by one
        assert_eq!(derange_indices(4, &mut ZeroRng).unwrap(), vec![1, 2, 3, 0]);
        assert_eq!(derange_indices(2, &mut ZeroRng).unwrap(), vec![1, 0]);
    }

    #[test]
    fn fixed_points_are_detected() {
        assert!(is_derangement(&[1, 0, 3, 2]));
        assert!(!is_derangement(&[1, 0, 2]));
        assert!(!is_derangement(&[0, 1]));
    }

    #[test]
    fn debug_does_not_leak_pairs() {
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let assignment = assign(&["Alice", "Bob"], &mut rng).unwrap();

        let debug = format!("{assignment:?}");
        assert!(!debug.contains("Alice"));
        assert!(debug.contains("len: 2"));
    }
}
