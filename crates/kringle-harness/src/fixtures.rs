//! Cheap parameters and precomputed keys for tests.
//!
//! Real derivation is deliberately slow. Tests run the same code paths with
//! 1024-bit moduli and a handful of PBKDF2 iterations, and share one keypair
//! per simulated client.

use std::sync::OnceLock;

use kringle_crypto::{DerivationParams, KeySalt, Keypair, derive_keypair};
use kringle_server::RoomManagerConfig;

use crate::model::{ClientId, MAX_CLIENTS, password_for, username_for};

/// Smallest parameters the derivation accepts.
pub const FAST_PARAMS: DerivationParams = DerivationParams { iterations: 10, modulus_bits: 1024 };

/// Manager configuration with single-iteration password verifiers that
/// accepts keys derived with [`FAST_PARAMS`].
pub fn fast_config() -> RoomManagerConfig {
    RoomManagerConfig {
        verifier_iterations: 1,
        min_key_bits: FAST_PARAMS.modulus_bits,
        ..RoomManagerConfig::default()
    }
}

/// Fixed keypair for a simulated client, derived once per process.
///
/// `None` for ids at or above [`MAX_CLIENTS`].
pub fn client_keypair(client: ClientId) -> Option<&'static Keypair> {
    static KEYS: OnceLock<Option<Vec<Keypair>>> = OnceLock::new();

    KEYS.get_or_init(|| {
        let salt = KeySalt::new([0x5a; kringle_crypto::KEY_SALT_LEN]);
        (0..MAX_CLIENTS)
            .map(|c| {
                derive_keypair(&username_for(c), &password_for(c), "fixtures", &salt, &FAST_PARAMS)
                    .map_err(|err| {
                        tracing::error!(client = c, %err, "fixture key derivation failed");
                    })
                    .ok()
            })
            .collect()
    })
    .as_ref()?
    .get(usize::from(client))
}
