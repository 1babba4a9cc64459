//! Salted password verifiers for participant and host authentication
//!
//! Independent of key derivation: the verifier salt is never the key salt, so
//! a stored verifier reveals nothing about the derived key material beyond
//! what the password itself does.

use base64::{Engine, engine::general_purpose::STANDARD};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::CryptoError;

/// Default PBKDF2 iteration count for verifiers
pub const DEFAULT_VERIFIER_ITERATIONS: u32 = 10_000;

/// Scheme tag in the text encoding
const SCHEME: &str = "pbkdf2-sha256";

const VERIFIER_SALT_LEN: usize = 16;
const VERIFIER_HASH_LEN: usize = 32;

/// PBKDF2-HMAC-SHA256 password hash.
///
/// Text form: `pbkdf2-sha256$<iterations>$<salt b64>$<hash b64>`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordVerifier {
    iterations: u32,
    salt: [u8; VERIFIER_SALT_LEN],
    hash: [u8; VERIFIER_HASH_LEN],
}

impl PasswordVerifier {
    /// Hash `password` under a caller-provided random salt.
    pub fn create(password: &str, salt: [u8; VERIFIER_SALT_LEN], iterations: u32) -> Self {
        let iterations = iterations.max(1);
        let hash = hash_password(password, &salt, iterations);
        Self { iterations, salt, hash }
    }

    /// Check `password` against the stored hash in constant time.
    pub fn verify(&self, password: &str) -> bool {
        let candidate = hash_password(password, &self.salt, self.iterations);
        candidate[..].ct_eq(&self.hash[..]).into()
    }

    /// Iteration count this verifier was created with.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Text encoding for storage.
    pub fn encode(&self) -> String {
        format!(
            "{SCHEME}${}${}${}",
            self.iterations,
            STANDARD.encode(self.salt),
            STANDARD.encode(self.hash)
        )
    }

    /// Parse the text encoding produced by [`encode`](Self::encode).
    pub fn parse(text: &str) -> Result<Self, CryptoError> {
        let mut parts = text.split('$');
        let (Some(scheme), Some(iterations), Some(salt), Some(hash), None) =
            (parts.next(), parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidVerifier);
        };

        if scheme != SCHEME {
            return Err(CryptoError::InvalidVerifier);
        }

        let iterations: u32 = iterations.parse().map_err(|_| CryptoError::InvalidVerifier)?;
        if iterations == 0 {
            return Err(CryptoError::InvalidVerifier);
        }

        let salt = decode_fixed::<VERIFIER_SALT_LEN>(salt)?;
        let hash = decode_fixed::<VERIFIER_HASH_LEN>(hash)?;

        Ok(Self { iterations, salt, hash })
    }
}

impl std::fmt::Debug for PasswordVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordVerifier").field("iterations", &self.iterations).finish()
    }
}

fn hash_password(
    password: &str,
    salt: &[u8; VERIFIER_SALT_LEN],
    iterations: u32,
) -> [u8; VERIFIER_HASH_LEN] {
    let mut out = [0u8; VERIFIER_HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut out);
    out
}

fn decode_fixed<const N: usize>(text: &str) -> Result<[u8; N], CryptoError> {
    let bytes = STANDARD.decode(text).map_err(|_| CryptoError::InvalidVerifier)?;
    bytes.try_into().map_err(|_| CryptoError::InvalidVerifier)
}

#[cfg(feature = "serde")]
impl serde::Serialize for PasswordVerifier {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.encode())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for PasswordVerifier {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}
