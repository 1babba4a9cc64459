//! Kringle Cryptographic Primitives
//!
//! Cryptographic building blocks for the Kringle draw. Pure functions with
//! deterministic outputs wherever the protocol allows it. Callers provide
//! randomness (OAEP padding, salts) so tests can run against seeded
//! generators.
//!
//! # Key Lifecycle
//!
//! A participant's keypair is never stored anywhere. It is re-derived from
//! credentials every time it is needed and dropped right after use.
//!
//! ```text
//! username, password, room id
//!        │
//!        ▼
//! Length-prefixed seed encoding
//!        │
//!        ▼
//! PBKDF2-HMAC-SHA256 (100k iterations, key salt) → 64 bytes
//!        │
//!        ▼
//! HMAC-SHA256 counter stream (bounded)
//!        │
//!        ▼
//! Prime search → RSA-2048 keypair (e = 65537)
//! ```
//!
//! The public half is registered with the room. The host encrypts each
//! receiver's username under the giver's public key with RSA-OAEP-SHA256; the
//! giver later re-derives the private half and decrypts.
//!
//! # Security
//!
//! Determinism:
//! - No system entropy is consumed during key generation
//! - Identical credentials and salt always yield bit-identical keys
//!
//! Salt separation:
//! - The key salt makes derivation unique per participant even when two
//!   participants share a password
//! - Password verifiers use their own independent salt
//!
//! Recipient binding:
//! - OAEP with SHA-256 for both hash and MGF1, pinned as a protocol constant
//! - A ciphertext opens only under the private key matching the public key it
//!   was sealed to; every other key yields [`CryptoError::DecryptionFailed`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod error;
pub mod keys;
pub mod oaep;
mod salt;
mod verifier;

pub use error::CryptoError;
pub use keys::{
    ByteSource, DerivationParams, DerivedStream, Keypair, PublicKey, SeedMaterial, derive_keypair,
};
pub use oaep::{Ciphertext, decrypt, encrypt, max_plaintext_len};
pub use salt::{KEY_SALT_LEN, KeySalt};
pub use verifier::{DEFAULT_VERIFIER_ITERATIONS, PasswordVerifier};
