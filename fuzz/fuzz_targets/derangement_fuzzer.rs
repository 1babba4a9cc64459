//! Fuzz target for the derangement generator
//!
//! # Strategy
//!
//! - Arbitrary participant counts, including 0 and 1
//! - Arbitrary RNG seeds
//! - Duplicate names mixed into otherwise valid lists
//!
//! # Invariants
//!
//! - Fewer than two participants is an error, never a result
//! - Every result is a bijection with no fixed point
//! - Duplicates are rejected before any shuffling
//! - NEVER panic

#![no_main]

use std::collections::HashSet;

use arbitrary::Arbitrary;
use kringle_core::{DerangementError, assign};
use libfuzzer_sys::fuzz_target;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

#[derive(Debug, Arbitrary)]
struct Input {
    seed: [u8; 32],
    count: u8,
    duplicate: Option<(u8, u8)>,
}

fuzz_target!(|input: Input| {
    let mut names: Vec<u16> = (0..u16::from(input.count)).collect();
    if let Some((from, to)) = input.duplicate {
        let (from, to) = (usize::from(from), usize::from(to));
        if from < names.len() && to < names.len() && from != to {
            names[to] = names[from];
        }
    }
    let has_duplicates = names.iter().collect::<HashSet<_>>().len() != names.len();

    let mut rng = ChaCha20Rng::from_seed(input.seed);
    match assign(&names, &mut rng) {
        Ok(assignment) => {
            assert!(names.len() >= 2);
            assert!(!has_duplicates);
            assert_eq!(assignment.len(), names.len());

            let mut receivers = HashSet::new();
            for (giver, receiver) in assignment.pairs() {
                assert_ne!(giver, receiver, "fixed point");
                assert!(receivers.insert(*receiver), "receiver drawn twice");
            }
            assert_eq!(receivers.len(), names.len());
        },
        Err(DerangementError::TooFewParticipants { count }) => {
            assert!(count < 2);
            assert_eq!(count, names.len());
        },
        Err(DerangementError::DuplicateParticipant) => assert!(has_duplicates),
        Err(DerangementError::Unreachable { .. }) => panic!("valid input exhausted attempts"),
    }
});
