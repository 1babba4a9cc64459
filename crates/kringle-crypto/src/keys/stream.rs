//! Bounded deterministic byte stream for key generation
//!
//! # Security Properties
//!
//! - Determinism: same material always produces the same byte sequence
//! - Isolation: the stream is the only randomness the prime search sees
//! - Boundedness: drawing past the limit fails instead of looping forever

use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::Zeroize;

use super::seed::SeedMaterial;
use crate::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Label mixed into every stream block
const STREAM_LABEL: &[u8] = b"kringle-keygen-v1";

/// Output size of one HMAC-SHA256 block
const BLOCK_LEN: usize = 32;

/// Upper bound on bytes a single derivation may draw (4 MiB).
///
/// A 2048-bit key needs on the order of a few hundred 128-byte candidates
/// per prime, so this leaves several orders of magnitude of headroom.
pub const MAX_STREAM_BYTES: usize = 4 * 1024 * 1024;

/// Injected randomness for key generation.
///
/// Key generation takes a `ByteSource` instead of reaching for a global RNG,
/// so the caller decides exactly where every consumed byte comes from.
pub trait ByteSource {
    /// Fill `dest` completely or fail without partial guarantees.
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), CryptoError>;
}

/// HMAC-SHA256 counter-mode expansion of [`SeedMaterial`].
///
/// Block `i` is `HMAC(material, "kringle-keygen-v1" || i)` with `i` as a
/// big-endian `u64`. Bytes are consumed in order with no skipping.
pub struct DerivedStream {
    mac: HmacSha256,
    counter: u64,
    block: [u8; BLOCK_LEN],
    offset: usize,
    drawn: usize,
    limit: usize,
}

impl DerivedStream {
    /// Stream bounded by [`MAX_STREAM_BYTES`].
    pub fn new(material: &SeedMaterial) -> Self {
        Self::with_limit(material, MAX_STREAM_BYTES)
    }

    /// Stream bounded by an explicit byte budget.
    #[allow(clippy::expect_used)]
    pub fn with_limit(material: &SeedMaterial, limit: usize) -> Self {
        let mac = HmacSha256::new_from_slice(material.as_bytes())
            .expect("invariant: HMAC accepts keys of any length");

        Self { mac, counter: 0, block: [0u8; BLOCK_LEN], offset: BLOCK_LEN, drawn: 0, limit }
    }

    /// Bytes handed out so far.
    pub fn drawn(&self) -> usize {
        self.drawn
    }

    fn refill(&mut self) {
        let mut mac = self.mac.clone();
        mac.update(STREAM_LABEL);
        mac.update(&self.counter.to_be_bytes());

        self.block.zeroize();
        self.block.copy_from_slice(&mac.finalize().into_bytes());
        self.counter += 1;
        self.offset = 0;
    }
}

impl ByteSource for DerivedStream {
    fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), CryptoError> {
        if self.limit.saturating_sub(self.drawn) < dest.len() {
            return Err(CryptoError::KeyDerivationExhausted { drawn: self.drawn });
        }

        let mut written = 0;
        while written < dest.len() {
            if self.offset == BLOCK_LEN {
                self.refill();
            }

            let take = (BLOCK_LEN - self.offset).min(dest.len() - written);
            dest[written..written + take]
                .copy_from_slice(&self.block[self.offset..self.offset + take]);
            self.offset += take;
            written += take;
        }

        self.drawn += dest.len();
        Ok(())
    }
}

impl Drop for DerivedStream {
    fn drop(&mut self) {
        self.block.zeroize();
    }
}
