//! Deterministic keypair derivation from participant credentials.
//!
//! A keypair is a pure function of `(username, password, room id, key salt)`.
//! Nothing is stored; the same inputs rebuild the same key on any machine.

mod keypair;
mod seed;
mod stream;

pub use keypair::{Keypair, PUBLIC_EXPONENT, PublicKey, derive_keypair};
pub use seed::{DerivationParams, SEED_MATERIAL_LEN, SeedMaterial, encode_seed};
pub use stream::{ByteSource, DerivedStream, MAX_STREAM_BYTES};
