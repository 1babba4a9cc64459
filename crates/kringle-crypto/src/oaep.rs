//! Per-recipient encryption using RSA-OAEP
//!
//! SHA-256 is used for both the OAEP hash and MGF1 with an empty label. These
//! choices are protocol constants: a mismatch between sides does not produce
//! an error at encryption time, only a silent failure to decrypt later.
//!
//! OAEP randomness is supplied by the caller.

use base64::{Engine, engine::general_purpose::STANDARD};
use rand_core::CryptoRngCore;
use rsa::Oaep;
use sha2::Sha256;

use crate::{CryptoError, Keypair, PublicKey};

/// SHA-256 output size, which sets the OAEP overhead
const HASH_LEN: usize = 32;

/// Largest plaintext OAEP-SHA256 can carry under `key` (`k - 2h - 2`).
///
/// 190 bytes for a 2048-bit modulus.
pub fn max_plaintext_len(key: &PublicKey) -> usize {
    key.modulus_len().saturating_sub(2 * HASH_LEN + 2)
}

/// Opaque RSA-OAEP ciphertext.
///
/// Carries no recipient identity; binding to a participant is done by whoever
/// stores it.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ciphertext(Vec<u8>);

impl Ciphertext {
    /// Wrap raw ciphertext bytes.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Parse the standard base64 transport form.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        STANDARD.decode(text.trim()).map(Self).map_err(|_| CryptoError::InvalidEncoding)
    }

    /// Standard base64 transport form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.0)
    }

    /// Raw ciphertext bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Ciphertext length in bytes (equals the modulus size when well-formed).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for an empty ciphertext, which never decrypts.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Ciphertext {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Ciphertext {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_base64(&text).map_err(serde::de::Error::custom)
    }
}

/// Encrypt `plaintext` so that only the holder of `key`'s private half can
/// read it.
///
/// # Errors
///
/// - `PlaintextTooLong`: input exceeds [`max_plaintext_len`]
/// - `Encryption`: the RSA primitive failed (not expected with valid keys)
pub fn encrypt<R: CryptoRngCore>(
    plaintext: &[u8],
    key: &PublicKey,
    rng: &mut R,
) -> Result<Ciphertext, CryptoError> {
    let max = max_plaintext_len(key);
    if plaintext.len() > max {
        return Err(CryptoError::PlaintextTooLong { len: plaintext.len(), max });
    }

    key.inner()
        .encrypt(rng, Oaep::new::<Sha256>(), plaintext)
        .map(Ciphertext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))
}

/// Decrypt a ciphertext with a derived keypair.
///
/// Every failure (wrong key, truncated or tampered ciphertext, padding
/// mismatch) collapses to `DecryptionFailed`; callers treat it as a
/// recoverable outcome such as a mistyped password.
pub fn decrypt(ciphertext: &Ciphertext, keypair: &Keypair) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() != keypair.public_key().modulus_len() {
        return Err(CryptoError::DecryptionFailed);
    }

    keypair
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), ciphertext.as_bytes())
        .map_err(|_| CryptoError::DecryptionFailed)
}
