//! Fuzz target for room lifecycle transitions
//!
//! Drives a `Room` value directly with arbitrary transitions, including
//! malformed keys and hand-built start batches that a well-behaved host
//! would never send.
//!
//! # Invariants
//!
//! - A rejected transition leaves the room bit-for-bit unchanged
//! - `Started` is terminal: no later transition changes the room
//! - A started room holds exactly one ciphertext per participant and each
//!   matches its giver's modulus
//! - An open room holds no ciphertexts
//! - Every registered key can seal every participant's name
//! - NEVER panic

#![no_main]

use arbitrary::Arbitrary;
use kringle_core::{
    Participant, Room, RoomId, RoomName, RoomStatus, SealedAssignment, StartBatch, Username,
};
use kringle_crypto::{Ciphertext, KeySalt, PasswordVerifier, PublicKey, max_plaintext_len};
use kringle_harness::{FAST_PARAMS, client_keypair};
use libfuzzer_sys::fuzz_target;

const CLIENTS: u8 = 6;
const MIN_KEY_BITS: usize = FAST_PARAMS.modulus_bits;

#[derive(Debug, Arbitrary)]
enum Transition {
    Admit { client: u8 },
    RegisterKey { client: u8, key_of: u8 },
    RegisterGarbage { client: u8, pem: String },
    Remove { client: u8 },
    Start { min: u8, entries: Vec<BatchEntry> },
    Grant { client: u8 },
}

#[derive(Debug, Arbitrary)]
struct BatchEntry {
    giver: u8,
    ciphertext_len: u8,
}

fn username(client: u8) -> Username {
    Username::parse(&format!("client{}", client % CLIENTS)).unwrap()
}

fn pem(client: u8) -> Option<String> {
    client_keypair(client % CLIENTS)?.public_key().to_pem().ok()
}

fn check_invariants(room: &Room) {
    let longest = room.participants().iter().map(|p| p.username().as_str().len()).max();
    for pem in room.participants().iter().filter_map(|p| p.public_key()) {
        let key = PublicKey::from_pem(pem).expect("registered key does not parse");
        assert!(max_plaintext_len(&key) >= longest.unwrap_or(0), "key cannot seal every name");
    }

    let sealed = room.participants().iter().filter(|p| p.ciphertext().is_some()).count();
    match room.status() {
        RoomStatus::Open => assert_eq!(sealed, 0, "open room holds ciphertexts"),
        RoomStatus::Started => {
            assert_eq!(sealed, room.participants().len());
            assert!(room.participants().len() >= 2);
            for participant in room.participants() {
                let key = PublicKey::from_pem(participant.public_key().unwrap_or_default())
                    .expect("started room holds an invalid key");
                let len = participant.ciphertext().map_or(0, Ciphertext::len);
                assert_eq!(len, key.modulus_len());
            }
        },
    }
}

fuzz_target!(|transitions: Vec<Transition>| {
    let name = RoomName::parse("fuzz").unwrap();
    let mut room = Room::new(RoomId::new(1), name, PasswordVerifier::create("host", [0; 16], 1), 0);

    for transition in transitions.into_iter().take(64) {
        let before = room.clone();

        let result = match &transition {
            Transition::Admit { client } => {
                let verifier = PasswordVerifier::create("password", [*client; 16], 1);
                let salt = KeySalt::new([*client; 16]);
                let participant = Participant::new(username(*client), verifier, salt);
                room.admit(participant, 5).map(|_| ())
            },
            Transition::RegisterKey { client, key_of } => match pem(*key_of) {
                Some(pem) => room.set_public_key(&username(*client), &pem, MIN_KEY_BITS),
                None => Ok(()),
            },
            Transition::RegisterGarbage { client, pem } => {
                room.set_public_key(&username(*client), pem, MIN_KEY_BITS)
            },
            Transition::Remove { client } => room.remove(&username(*client)).map(|_| ()),
            Transition::Start { min, entries } => {
                let assignments = entries
                    .iter()
                    .take(8)
                    .map(|entry| {
                        let len = usize::from(entry.ciphertext_len);
                        SealedAssignment {
                            giver: username(entry.giver),
                            ciphertext: Ciphertext::from_bytes(vec![0; len]),
                        }
                    })
                    .collect();
                room.apply_start(&StartBatch { assignments }, usize::from(*min))
            },
            Transition::Grant { client } => room.grant(&username(*client)).map(|_| ()),
        };

        if result.is_err() || before.status() == RoomStatus::Started {
            assert_eq!(room, before, "transition {transition:?} changed the room");
        }
        check_invariants(&room);
    }
});
