//! Room Manager behavior tests
//!
//! End-to-end draws through the real manager: participants derive keys with
//! the client protocol, the host seals the batch, everyone reveals.

use std::collections::HashSet;

use kringle_core::{
    Credentials, Environment, ErrorCategory, LifecycleError, RoomError, RoomId, RoomStatus,
    SealedAssignment, StartBatch, Username, prepare_start, register, reveal,
};
use kringle_crypto::{Ciphertext, DerivedStream, Keypair, SeedMaterial, keys::SEED_MATERIAL_LEN};
use kringle_harness::{FAST_PARAMS, SimEnv, client_keypair, fast_config};
use kringle_server::{MemoryStorage, RoomManager, RoomManagerConfig, ServerError};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;

const HOST: &str = "host-secret";

type Manager = RoomManager<SimEnv, MemoryStorage>;

fn manager(seed: u64) -> Manager {
    RoomManager::new(SimEnv::with_seed(seed), MemoryStorage::new(), fast_config())
}

/// Join and register a derived key, as the `join` command does.
fn join(manager: &Manager, room: RoomId, username: &str, password: &str) {
    let salt = manager.issue_key_salt(room, username, password).unwrap();
    let credentials = Credentials::new(username, password, room).unwrap();
    let registration = register(&credentials, &salt, &FAST_PARAMS, |_| {}).unwrap();
    manager.register_public_key(room, username, password, &registration.public_key).unwrap();
}

fn start(manager: &Manager, room: RoomId, seed: u64) -> Result<(), ServerError> {
    let roster = manager.roster(room, HOST)?;
    let mut rng = ChaCha20Rng::seed_from_u64(seed);
    let batch = prepare_start(&roster, &mut rng, |_| {})?;
    manager.start(room, HOST, &batch)
}

fn reveal_for(manager: &Manager, room: RoomId, username: &str, password: &str) -> Username {
    let grant = manager.login(room, username, password).unwrap();
    let credentials = Credentials::new(username, password, room).unwrap();
    reveal(&credentials, &grant, &FAST_PARAMS, |_| {}).unwrap()
}

fn three_party_room(manager: &Manager) -> RoomId {
    let room = manager.create_room("Office party", HOST).unwrap();
    join(manager, room, "Alice", "alice-pw");
    join(manager, room, "Bob", "bob-pw1");
    join(manager, room, "Carol", "carol-pw");
    room
}

fn assert_lifecycle(err: &ServerError, expected: &LifecycleError) {
    match err {
        ServerError::Room(RoomError::Lifecycle(actual)) => assert_eq!(actual, expected),
        ServerError::Protocol(kringle_core::ProtocolError::Lifecycle(actual)) => {
            assert_eq!(actual, expected);
        },
        other => panic!("expected {expected:?}, got {other:?}"),
    }
}

#[test]
fn three_party_draw_is_a_derangement() {
    let manager = manager(1);
    let room = three_party_room(&manager);

    start(&manager, room, 7).unwrap();
    assert_eq!(manager.summary(room).unwrap().status, RoomStatus::Started);

    let parties = [("Alice", "alice-pw"), ("Bob", "bob-pw1"), ("Carol", "carol-pw")];
    let mut receivers = HashSet::new();
    for (username, password) in parties {
        let receiver = reveal_for(&manager, room, username, password);
        assert_ne!(receiver.as_str(), username, "{username} drew themselves");
        assert!(parties.iter().any(|(name, _)| *name == receiver.as_str()));
        receivers.insert(receiver);
    }
    assert_eq!(receivers.len(), 3, "receivers must be a permutation");
}

#[test]
fn reveal_is_stable_across_logins() {
    let manager = manager(2);
    let room = three_party_room(&manager);
    start(&manager, room, 11).unwrap();

    let first = reveal_for(&manager, room, "Bob", "bob-pw1");
    let second = reveal_for(&manager, room, "Bob", "bob-pw1");
    assert_eq!(first, second);
}

#[test]
fn second_start_is_rejected_and_keeps_ciphertexts() {
    let manager = manager(3);
    let room = three_party_room(&manager);
    start(&manager, room, 5).unwrap();

    let before = manager.login(room, "Alice", "alice-pw").unwrap();

    let err = start(&manager, room, 6).unwrap_err();
    assert_lifecycle(&err, &LifecycleError::AlreadyStarted);

    let after = manager.login(room, "Alice", "alice-pw").unwrap();
    assert_eq!(before, after);
}

#[test]
fn login_before_start_is_not_started() {
    let manager = manager(4);
    let room = three_party_room(&manager);

    let err = manager.login(room, "Bob", "bob-pw1").unwrap_err();
    assert_lifecycle(&err, &LifecycleError::NotStarted);
    assert!(!err.is_authentication());
}

#[test]
fn single_participant_cannot_start() {
    let manager = manager(5);
    let room = manager.create_room("Lonely", HOST).unwrap();
    join(&manager, room, "Alice", "alice-pw");

    let err = start(&manager, room, 1).unwrap_err();
    assert_lifecycle(&err, &LifecycleError::TooFewParticipants { required: 2, actual: 1 });
    assert_eq!(manager.summary(room).unwrap().status, RoomStatus::Open);
}

#[test]
fn server_enforces_minimum_on_its_own() {
    let manager = manager(18);
    let room = manager.create_room("Lonely", HOST).unwrap();
    join(&manager, room, "Alice", "alice-pw");

    let empty = StartBatch { assignments: Vec::new() };
    let err = manager.start(room, HOST, &empty).unwrap_err();
    assert_lifecycle(&err, &LifecycleError::TooFewParticipants { required: 2, actual: 1 });
}

#[test]
fn tampered_batches_leave_the_room_open() {
    let manager = manager(19);
    let room = three_party_room(&manager);
    let roster = manager.roster(room, HOST).unwrap();
    let batch = prepare_start(&roster, &mut ChaCha20Rng::seed_from_u64(9), |_| {}).unwrap();

    let mut short = batch.clone();
    short.assignments.pop();
    let err = manager.start(room, HOST, &short).unwrap_err();
    assert!(matches!(err, ServerError::Room(RoomError::BatchMismatch(_))), "{err:?}");

    let mut duplicated = batch.clone();
    duplicated.assignments[2] = duplicated.assignments[0].clone();
    let err = manager.start(room, HOST, &duplicated).unwrap_err();
    assert!(matches!(err, ServerError::Room(RoomError::BatchMismatch(_))), "{err:?}");

    let mut truncated = batch.clone();
    truncated.assignments[1] = SealedAssignment {
        giver: truncated.assignments[1].giver.clone(),
        ciphertext: Ciphertext::from_bytes(vec![0; 16]),
    };
    let err = manager.start(room, HOST, &truncated).unwrap_err();
    assert!(matches!(err, ServerError::Room(RoomError::InvalidCiphertext(_))), "{err:?}");

    assert_eq!(manager.summary(room).unwrap().status, RoomStatus::Open);
    manager.start(room, HOST, &batch).unwrap();
}

#[test]
fn unregistered_participant_blocks_start() {
    let manager = manager(6);
    let room = manager.create_room("Party", HOST).unwrap();
    join(&manager, room, "Alice", "alice-pw");
    join(&manager, room, "Bob", "bob-pw1");
    manager.issue_key_salt(room, "Carol", "carol-pw").unwrap();

    let err = start(&manager, room, 1).unwrap_err();
    let carol = Username::parse("Carol").unwrap();
    assert_lifecycle(&err, &LifecycleError::IncompleteRegistration(carol));
}

#[test]
fn key_salt_is_stable_for_returning_participants() {
    let manager = manager(7);
    let room = manager.create_room("Party", HOST).unwrap();

    let first = manager.issue_key_salt(room, "Alice", "alice-pw").unwrap();
    let second = manager.issue_key_salt(room, "Alice", "alice-pw").unwrap();
    assert_eq!(first, second);

    let other = manager.issue_key_salt(room, "Bob", "bob-pw1").unwrap();
    assert_ne!(first, other);
}

#[test]
fn key_registration_is_idempotent() {
    let manager = manager(8);
    let room = manager.create_room("Party", HOST).unwrap();
    join(&manager, room, "Alice", "alice-pw");

    let pem = manager.roster(room, HOST).unwrap()[0].public_key.clone().unwrap();
    manager.register_public_key(room, "Alice", "alice-pw", &pem).unwrap();

    // A key derived under different credentials is a different key.
    join(&manager, room, "Bob", "bob-pw1");
    let bob_pem = manager.roster(room, HOST).unwrap()[1].public_key.clone().unwrap();
    let err = manager.register_public_key(room, "Alice", "alice-pw", &bob_pem).unwrap_err();
    assert!(matches!(err, ServerError::Room(RoomError::PublicKeyMismatch(_))), "{err:?}");
}

#[test]
fn undersized_key_is_rejected_at_registration() {
    let manager = manager(18);
    let room = manager.create_room("Party", HOST).unwrap();
    join(&manager, room, "Alice", "alice-pw");
    join(&manager, room, "Bob", "bob-pw1");

    let material = SeedMaterial::from_bytes([7; SEED_MATERIAL_LEN]);
    let tiny = Keypair::generate_from_source(&mut DerivedStream::new(&material), 512).unwrap();
    manager.issue_key_salt(room, "mallory", "mallory-pw").unwrap();

    let err = manager
        .register_public_key(room, "mallory", "mallory-pw", &tiny.public_key().to_pem().unwrap())
        .unwrap_err();
    match &err {
        ServerError::Room(RoomError::WeakPublicKey { username, bits }) => {
            assert_eq!(username.as_str(), "mallory");
            assert_eq!(*bits, 512);
        },
        other => panic!("expected WeakPublicKey, got {other:?}"),
    }
    assert_eq!(err.category(), ErrorCategory::InputShape);

    let roster = manager.roster(room, HOST).unwrap();
    assert_eq!(roster[2].public_key, None);

    manager.remove_participant(room, HOST, "mallory").unwrap();
    start(&manager, room, 6).unwrap();
}

#[test]
fn key_floor_defaults_to_protocol_size() {
    let config = RoomManagerConfig { verifier_iterations: 1, ..RoomManagerConfig::default() };
    assert_eq!(config.min_key_bits, 2048);

    let manager = RoomManager::new(SimEnv::with_seed(19), MemoryStorage::new(), config);
    let room = manager.create_room("Party", HOST).unwrap();
    manager.issue_key_salt(room, "client0", "password-0").unwrap();

    let pem = client_keypair(0).unwrap().public_key().to_pem().unwrap();
    let err = manager.register_public_key(room, "client0", "password-0", &pem).unwrap_err();
    assert!(
        matches!(err, ServerError::Room(RoomError::WeakPublicKey { bits: 1024, .. })),
        "{err:?}"
    );
}

#[test]
fn short_passwords_are_input_errors_on_every_path() {
    let manager = manager(20);
    let room = three_party_room(&manager);
    let pem = manager.roster(room, HOST).unwrap()[0].public_key.clone().unwrap();

    let err = manager.register_public_key(room, "Alice", "short", &pem).unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput(_)), "{err:?}");
    assert_eq!(err.category(), ErrorCategory::InputShape);

    start(&manager, room, 7).unwrap();
    let err = manager.login(room, "Alice", "short").unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput(_)), "{err:?}");
    assert_eq!(err.category(), ErrorCategory::InputShape);

    // Shape is checked before the room is looked up.
    let err = manager.login(RoomId::new(0xdead_beef), "Alice", "short").unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput(_)), "{err:?}");
}

#[test]
fn wrong_password_and_unknown_user_look_the_same() {
    let manager = manager(9);
    let room = three_party_room(&manager);
    start(&manager, room, 3).unwrap();

    let wrong = manager.login(room, "Alice", "not-alice").unwrap_err();
    let unknown = manager.login(room, "Mallory", "alice-pw").unwrap_err();

    assert!(wrong.is_authentication());
    assert!(unknown.is_authentication());
    assert_eq!(wrong.to_string(), unknown.to_string());
}

#[test]
fn wrong_host_password_is_rejected() {
    let manager = manager(10);
    let room = three_party_room(&manager);

    assert!(manager.roster(room, "not-the-host").unwrap_err().is_authentication());
    let err = manager.remove_participant(room, "not-the-host", "Bob").unwrap_err();
    assert!(err.is_authentication());
    assert_eq!(manager.summary(room).unwrap().participants.len(), 3);
}

#[test]
fn removal_only_while_open() {
    let manager = manager(11);
    let room = three_party_room(&manager);

    manager.remove_participant(room, HOST, "Carol").unwrap();
    let names: Vec<_> = manager
        .summary(room)
        .unwrap()
        .participants
        .into_iter()
        .map(|p| p.username.as_str().to_string())
        .collect();
    assert_eq!(names, ["Alice", "Bob"]);

    start(&manager, room, 2).unwrap();
    let err = manager.remove_participant(room, HOST, "Bob").unwrap_err();
    assert_lifecycle(&err, &LifecycleError::AlreadyStarted);
}

#[test]
fn late_joiners_are_turned_away() {
    let manager = manager(12);
    let room = three_party_room(&manager);
    start(&manager, room, 4).unwrap();

    let err = manager.issue_key_salt(room, "Dave", "dave-pw1").unwrap_err();
    assert_lifecycle(&err, &LifecycleError::AlreadyStarted);

    // Existing members still get their salt back to re-derive.
    manager.issue_key_salt(room, "Alice", "alice-pw").unwrap();
}

#[test]
fn missing_room_is_not_found() {
    let manager = manager(13);
    let missing = RoomId::new(0xdead_beef);

    assert!(matches!(
        manager.summary(missing),
        Err(ServerError::RoomNotFound(id)) if id == missing
    ));
    assert!(matches!(
        manager.issue_key_salt(missing, "Alice", "alice-pw"),
        Err(ServerError::RoomNotFound(_))
    ));
}

#[test]
fn malformed_credentials_are_input_errors() {
    let manager = manager(14);
    let room = manager.create_room("Party", HOST).unwrap();

    let err = manager.issue_key_salt(room, "   ", "alice-pw").unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput(_)), "{err:?}");

    let err = manager.issue_key_salt(room, "Alice", "pw").unwrap_err();
    assert!(matches!(err, ServerError::InvalidInput(_)), "{err:?}");

    assert!(manager.summary(room).unwrap().participants.is_empty());
}

#[test]
fn rooms_are_listed() {
    let manager = manager(15);
    let a = manager.create_room("A", HOST).unwrap();
    let b = manager.create_room("B", HOST).unwrap();

    let mut listed = manager.list_rooms().unwrap();
    listed.sort();
    let mut expected = vec![a, b];
    expected.sort();
    assert_eq!(listed, expected);
}

#[test]
fn creation_time_comes_from_the_environment() {
    let env = SimEnv::with_seed(16);
    env.advance_secs(3_600);
    let manager = RoomManager::new(env.clone(), MemoryStorage::new(), fast_config());

    let room = manager.create_room("Party", HOST).unwrap();
    assert_eq!(manager.summary(room).unwrap().created_at_secs, env.wall_clock_secs());
}

#[test]
fn same_seed_same_room_ids() {
    let a = manager(17).create_room("Party", HOST).unwrap();
    let b = manager(17).create_room("Party", HOST).unwrap();
    assert_eq!(a, b);
}
