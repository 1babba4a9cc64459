//! Fuzz target for every text and binary decoder an attacker can reach
//!
//! # Strategy
//!
//! - Base64 ciphertexts and key salts
//! - PEM public keys
//! - Password verifier strings
//! - Room ids, usernames and room names
//! - CBOR-encoded rooms (the on-disk format)
//! - Raw ciphertext bytes against a real private key
//!
//! # Invariants
//!
//! - Every decoder returns an error instead of panicking
//! - Whatever decodes re-encodes to something that decodes to the same value
//! - Decrypting arbitrary bytes fails (OAEP padding check)
//! - NEVER panic

#![no_main]

use std::str::FromStr;

use arbitrary::Arbitrary;
use kringle_core::{Room, RoomId, RoomName, Username};
use kringle_crypto::{Ciphertext, KeySalt, PasswordVerifier, PublicKey, decrypt};
use kringle_harness::client_keypair;
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Input {
    Ciphertext(String),
    KeySalt(String),
    PublicKey(String),
    Verifier(String),
    RoomId(String),
    Username(String),
    RoomName(String),
    StoredRoom(Vec<u8>),
    RawCiphertext(Vec<u8>),
}

fuzz_target!(|input: Input| {
    match input {
        Input::Ciphertext(text) => {
            if let Ok(ciphertext) = Ciphertext::from_base64(&text) {
                let again = Ciphertext::from_base64(&ciphertext.to_base64()).unwrap();
                assert_eq!(again, ciphertext);
            }
        },
        Input::KeySalt(text) => {
            if let Ok(salt) = KeySalt::from_base64(&text) {
                assert_eq!(KeySalt::from_base64(&salt.to_base64()).unwrap(), salt);
            }
        },
        Input::PublicKey(text) => {
            if let Ok(key) = PublicKey::from_pem(&text) {
                let pem = key.to_pem().unwrap();
                assert_eq!(PublicKey::from_pem(&pem).unwrap().to_pem().unwrap(), pem);
            }
        },
        Input::Verifier(text) => {
            if let Ok(verifier) = PasswordVerifier::parse(&text) {
                assert_eq!(PasswordVerifier::parse(&verifier.encode()).unwrap(), verifier);
            }
        },
        Input::RoomId(text) => {
            if let Ok(id) = RoomId::from_str(&text) {
                assert_eq!(RoomId::from_str(&id.to_string()).unwrap(), id);
            }
        },
        Input::Username(text) => {
            if let Ok(name) = Username::parse(&text) {
                assert_eq!(Username::parse(name.as_str()).unwrap(), name);
            }
        },
        Input::RoomName(text) => {
            if let Ok(name) = RoomName::parse(&text) {
                assert_eq!(RoomName::parse(name.as_str()).unwrap(), name);
            }
        },
        Input::StoredRoom(bytes) => {
            let _ = ciborium::from_reader::<Room, _>(bytes.as_slice());
        },
        Input::RawCiphertext(bytes) => {
            let keypair = client_keypair(0).unwrap();
            let ciphertext = Ciphertext::from_bytes(bytes);
            assert!(decrypt(&ciphertext, keypair).is_err());
        },
    }
});
