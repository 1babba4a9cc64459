//! Chaos tests for the room manager over failing storage
//!
//! Wraps the backends in `ChaoticStorage` and checks that a failed write
//! never leaves a half-applied transition behind:
//! - A room is either fully started (every ciphertext stored) or still open
//! - Rejected joins leave no participant behind
//! - Whatever did commit reads back consistently

use kringle_core::{Credentials, RoomId, RoomStatus, prepare_start, register};
use kringle_harness::{FAST_PARAMS, SimEnv, client_keypair, fast_config};
use kringle_server::{
    ChaoticStorage, MemoryStorage, RedbStorage, RoomManager, ServerError, Storage, StorageError,
};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tempfile::tempdir;

const HOST: &str = "host-secret";

/// Room with `count` registered participants on reliable storage.
fn seeded_room(storage: &MemoryStorage, count: u8) -> RoomId {
    let manager = RoomManager::new(SimEnv::with_seed(1), storage.clone(), fast_config());
    let room = manager.create_room("Party", HOST).unwrap();

    for client in 0..count {
        let username = format!("user{client}");
        let password = format!("password{client}");
        manager.issue_key_salt(room, &username, &password).unwrap();
        let pem = client_keypair(client).unwrap().public_key().to_pem().unwrap();
        manager.register_public_key(room, &username, &password, &pem).unwrap();
    }

    room
}

/// Open, or started with a ciphertext for every participant.
fn assert_all_or_nothing(storage: &MemoryStorage, room: RoomId) {
    let stored = storage.load_room(room).unwrap().unwrap();
    let sealed = stored.participants().iter().filter(|p| p.ciphertext().is_some()).count();

    match stored.status() {
        RoomStatus::Open => assert_eq!(sealed, 0, "open room holds ciphertexts"),
        RoomStatus::Started => assert_eq!(sealed, stored.participants().len()),
    }
}

#[test]
fn failed_start_leaves_room_open() {
    let storage = MemoryStorage::new();
    let room = seeded_room(&storage, 3);

    let chaotic = ChaoticStorage::new(storage.clone(), 1.0).writes_only();
    let manager = RoomManager::new(SimEnv::with_seed(2), chaotic, fast_config());

    let roster = manager.roster(room, HOST).unwrap();
    let batch = prepare_start(&roster, &mut ChaCha20Rng::seed_from_u64(1), |_| {}).unwrap();

    let err = manager.start(room, HOST, &batch).unwrap_err();
    assert!(matches!(err, ServerError::Storage(StorageError::Io(_))), "{err:?}");
    assert!(manager.storage().injected_failures() > 0);

    assert_eq!(storage.load_room(room).unwrap().unwrap().status(), RoomStatus::Open);
    assert_all_or_nothing(&storage, room);

    // Retry on healthy storage succeeds with the same batch
    let healthy = RoomManager::new(SimEnv::with_seed(3), storage.clone(), fast_config());
    healthy.start(room, HOST, &batch).unwrap();
    assert_all_or_nothing(&storage, room);
}

#[test]
fn failed_join_leaves_no_participant() {
    let storage = MemoryStorage::new();
    let room = seeded_room(&storage, 0);

    let chaotic = ChaoticStorage::new(storage.clone(), 1.0).writes_only();
    let manager = RoomManager::new(SimEnv::with_seed(2), chaotic, fast_config());

    assert!(manager.issue_key_salt(room, "user0", "password0").is_err());
    assert!(storage.load_room(room).unwrap().unwrap().participants().is_empty());
}

#[test]
fn reads_are_unaffected_by_write_chaos() {
    let storage = MemoryStorage::new();
    let room = seeded_room(&storage, 2);

    let chaotic = ChaoticStorage::new(storage, 1.0).writes_only();
    let manager = RoomManager::new(SimEnv::with_seed(2), chaotic, fast_config());

    assert_eq!(manager.summary(room).unwrap().participants.len(), 2);
    assert_eq!(manager.roster(room, HOST).unwrap().len(), 2);
}

#[test]
fn prop_start_under_chaos_is_all_or_nothing() {
    proptest!(ProptestConfig::with_cases(32), |(
        failure_rate in 0.0..0.9,
        seed in any::<u64>(),
        count in 2u8..5,
    )| {
        let storage = MemoryStorage::new();
        let room = seeded_room(&storage, count);

        let chaotic = ChaoticStorage::with_seed(storage.clone(), failure_rate, seed);
        let manager = RoomManager::new(SimEnv::with_seed(seed), chaotic, fast_config());

        let started = manager
            .roster(room, HOST)
            .and_then(|roster| {
                let batch = prepare_start(&roster, &mut ChaCha20Rng::seed_from_u64(seed), |_| {})?;
                manager.start(room, HOST, &batch)
            });

        let stored = storage.load_room(room).unwrap().unwrap();
        match started {
            Ok(()) => {
                prop_assert_eq!(stored.status(), RoomStatus::Started);
            },
            Err(ServerError::Storage(err)) => {
                prop_assert!(err.is_transient(), "unexpected storage error {:?}", err);
                prop_assert_eq!(stored.status(), RoomStatus::Open);
            },
            Err(other) => {
                return Err(TestCaseError::fail(format!("unexpected error {other:?}")));
            },
        }
        assert_all_or_nothing(&storage, room);
    });
}

#[test]
fn prop_joins_under_chaos_match_commits() {
    proptest!(ProptestConfig::with_cases(32), |(
        failure_rate in 0.0..0.8,
        seed in any::<u64>(),
    )| {
        let storage = MemoryStorage::new();
        let room = seeded_room(&storage, 0);

        let chaotic = ChaoticStorage::with_seed(storage.clone(), failure_rate, seed).writes_only();
        let manager = RoomManager::new(SimEnv::with_seed(seed), chaotic, fast_config());

        let mut joined = Vec::new();
        for client in 0..6 {
            let username = format!("user{client}");
            if manager.issue_key_salt(room, &username, "password").is_ok() {
                joined.push(username);
            }
        }

        let stored: Vec<String> = storage
            .load_room(room)
            .unwrap()
            .unwrap()
            .participants()
            .iter()
            .map(|p| p.username().as_str().to_string())
            .collect();
        prop_assert_eq!(stored, joined);
    });
}

#[test]
fn redb_under_chaos_is_all_or_nothing() {
    let dir = tempdir().unwrap();
    let redb = RedbStorage::open(dir.path().join("chaos.redb")).unwrap();
    let manager = RoomManager::new(SimEnv::with_seed(5), redb.clone(), fast_config());

    let room = manager.create_room("Party", HOST).unwrap();
    for (username, password) in [("Alice", "alice-pw"), ("Bob", "bob-pw1")] {
        let salt = manager.issue_key_salt(room, username, password).unwrap();
        let credentials = Credentials::new(username, password, room).unwrap();
        let registration = register(&credentials, &salt, &FAST_PARAMS, |_| {}).unwrap();
        manager.register_public_key(room, username, password, &registration.public_key).unwrap();
    }

    let chaotic = ChaoticStorage::new(redb.clone(), 1.0).writes_only();
    let failing = RoomManager::new(SimEnv::with_seed(6), chaotic, fast_config());
    let roster = failing.roster(room, HOST).unwrap();
    let batch = prepare_start(&roster, &mut ChaCha20Rng::seed_from_u64(2), |_| {}).unwrap();

    assert!(failing.start(room, HOST, &batch).is_err());
    assert_eq!(redb.load_room(room).unwrap().unwrap().status(), RoomStatus::Open);

    manager.start(room, HOST, &batch).unwrap();
    assert_eq!(redb.load_room(room).unwrap().unwrap().status(), RoomStatus::Started);
}
