//! Error types for Kringle cryptographic primitives.

use thiserror::Error;

/// Errors produced by key derivation, encryption and credential encoding.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// The deterministic byte stream ran dry before two primes were found.
    ///
    /// Effectively unreachable with the protocol parameters, but fatal when
    /// it happens: retrying with the same inputs yields the same outcome.
    #[error("key derivation exhausted its byte stream after {drawn} bytes")]
    KeyDerivationExhausted {
        /// Bytes drawn from the stream before giving up
        drawn: usize,
    },

    /// Derivation parameters outside the supported range
    #[error("invalid derivation parameters: {0}")]
    InvalidParameters(&'static str),

    /// Primes were found but the RSA key could not be assembled from them
    #[error("key assembly failed: {0}")]
    KeyAssembly(String),

    /// Plaintext exceeds what OAEP can carry for this modulus
    #[error("plaintext too long: {len} bytes, maximum is {max}")]
    PlaintextTooLong {
        /// Length of the rejected plaintext
        len: usize,
        /// Maximum accepted length for the key
        max: usize,
    },

    /// Encryption failed inside the RSA primitive
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, corrupted ciphertext or bad padding.
    ///
    /// Deliberately carries no detail about which check failed.
    #[error("decryption failed")]
    DecryptionFailed,

    /// Text did not decode as standard base64
    #[error("invalid base64 encoding")]
    InvalidEncoding,

    /// Public key PEM could not be parsed
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Key salt has the wrong length
    #[error("invalid key salt: expected {expected} bytes, got {got}")]
    InvalidSalt {
        /// Required salt length
        expected: usize,
        /// Length that was supplied
        got: usize,
    },

    /// Stored password verifier is malformed
    #[error("invalid password verifier")]
    InvalidVerifier,
}

impl CryptoError {
    /// Returns true if this error indicates a broken implementation or
    /// pathological input rather than a user mistake.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::KeyDerivationExhausted { .. } | Self::KeyAssembly(_) | Self::Encryption(_)
        )
    }
}
