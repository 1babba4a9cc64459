//! Credential seed encoding and PBKDF2 stretching

use sha2::Sha256;
use zeroize::{Zeroize, Zeroizing};

use crate::{CryptoError, KeySalt};

/// Domain label prefixed to every credential seed
const SEED_LABEL: &[u8] = b"kringle-seed-v1";

/// Bytes of stretched material produced by PBKDF2
pub const SEED_MATERIAL_LEN: usize = 64;

/// Smallest modulus accepted by [`DerivationParams::validate`]
const MIN_MODULUS_BITS: usize = 1024;

/// Tunable cost parameters for key derivation.
///
/// [`DerivationParams::PROTOCOL`] holds the values every deployment must use;
/// keys derived with anything else are incompatible with registered public
/// keys. Tests lower them to keep runtimes short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationParams {
    /// PBKDF2-HMAC-SHA256 iteration count
    pub iterations: u32,
    /// RSA modulus size in bits
    pub modulus_bits: usize,
}

impl DerivationParams {
    /// Protocol constants: 100,000 PBKDF2 iterations, 2048-bit modulus.
    pub const PROTOCOL: Self = Self { iterations: 100_000, modulus_bits: 2048 };

    /// Reject parameters the prime search cannot work with.
    pub fn validate(&self) -> Result<(), CryptoError> {
        if self.iterations == 0 {
            return Err(CryptoError::InvalidParameters("iterations must be at least 1"));
        }
        if self.modulus_bits < MIN_MODULUS_BITS {
            return Err(CryptoError::InvalidParameters("modulus must be at least 1024 bits"));
        }
        if self.modulus_bits % 16 != 0 {
            return Err(CryptoError::InvalidParameters("modulus bits must be a multiple of 16"));
        }
        Ok(())
    }
}

impl Default for DerivationParams {
    fn default() -> Self {
        Self::PROTOCOL
    }
}

/// Encode credentials into the low-entropy seed fed to PBKDF2.
///
/// Layout: `"kringle-seed-v1" || len(username) || username || len(password)
/// || password || len(room_id) || room_id`, each length a 4-byte big-endian
/// count of UTF-8 bytes. The length prefixes keep adjacent fields from
/// bleeding into each other (`("ab", "c")` and `("a", "bc")` encode
/// differently).
pub fn encode_seed(username: &str, password: &str, room_id: &str) -> Zeroizing<Vec<u8>> {
    let fields = [username.as_bytes(), password.as_bytes(), room_id.as_bytes()];
    let capacity = SEED_LABEL.len() + fields.iter().map(|f| 4 + f.len()).sum::<usize>();

    let mut seed = Zeroizing::new(Vec::with_capacity(capacity));
    seed.extend_from_slice(SEED_LABEL);
    for field in fields {
        seed.extend_from_slice(&(field.len() as u32).to_be_bytes());
        seed.extend_from_slice(field);
    }

    debug_assert_eq!(seed.len(), capacity);
    seed
}

/// Stretched key material, the sole entropy source of a derived keypair.
///
/// Zeroized on drop.
pub struct SeedMaterial {
    bytes: [u8; SEED_MATERIAL_LEN],
}

impl SeedMaterial {
    /// Run PBKDF2-HMAC-SHA256 over the encoded credentials.
    ///
    /// This is the deliberately expensive step: with the protocol iteration
    /// count it dominates the cost of a derivation.
    pub fn stretch(
        username: &str,
        password: &str,
        room_id: &str,
        salt: &KeySalt,
        params: &DerivationParams,
    ) -> Result<Self, CryptoError> {
        params.validate()?;

        let seed = encode_seed(username, password, room_id);
        let mut bytes = [0u8; SEED_MATERIAL_LEN];
        pbkdf2::pbkdf2_hmac::<Sha256>(&seed, salt.as_bytes(), params.iterations, &mut bytes);

        Ok(Self { bytes })
    }

    /// Wrap raw material directly. Used by tests and fuzzers.
    pub fn from_bytes(bytes: [u8; SEED_MATERIAL_LEN]) -> Self {
        Self { bytes }
    }

    /// Raw stretched bytes.
    pub fn as_bytes(&self) -> &[u8; SEED_MATERIAL_LEN] {
        &self.bytes
    }
}

impl Drop for SeedMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SeedMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SeedMaterial(<redacted>)")
    }
}
