//! RSA keypair assembly from a deterministic byte source

use num_bigint_dig::prime::probably_prime;
use rsa::{
    BigUint, RsaPrivateKey, RsaPublicKey,
    pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding},
    traits::PublicKeyParts,
};
use zeroize::Zeroizing;

use super::{
    seed::{DerivationParams, SeedMaterial},
    stream::{ByteSource, DerivedStream},
};
use crate::{CryptoError, KeySalt};

/// Fixed RSA public exponent
pub const PUBLIC_EXPONENT: u32 = 65_537;

/// Miller-Rabin rounds per candidate
const PRIMALITY_ROUNDS: usize = 20;

/// Derive the keypair for a set of credentials.
///
/// Pure and deterministic: the same `(username, password, room_id, salt,
/// params)` always yields a bit-identical keypair. No state is read or
/// written, and no system entropy is consumed.
///
/// # Errors
///
/// - `InvalidParameters`: `params` fail validation
/// - `KeyDerivationExhausted`: the byte stream ran out during prime search
pub fn derive_keypair(
    username: &str,
    password: &str,
    room_id: &str,
    salt: &KeySalt,
    params: &DerivationParams,
) -> Result<Keypair, CryptoError> {
    let material = SeedMaterial::stretch(username, password, room_id, salt, params)?;
    let mut stream = DerivedStream::new(&material);
    Keypair::generate_from_source(&mut stream, params.modulus_bits)
}

/// An RSA keypair that only ever lives in memory.
///
/// The private half is zeroized when the keypair is dropped.
pub struct Keypair {
    private: RsaPrivateKey,
}

impl Keypair {
    /// Generate a keypair drawing every random byte from `source`.
    ///
    /// Candidate procedure for each prime: draw `modulus_bits / 16` bytes as
    /// a big-endian integer, force the two top bits (so the product has
    /// exactly `modulus_bits` bits) and the low bit, then accept the first
    /// candidate with `gcd(c - 1, e) = 1` that passes the primality test and
    /// differs from the other prime.
    pub fn generate_from_source<S: ByteSource>(
        source: &mut S,
        modulus_bits: usize,
    ) -> Result<Self, CryptoError> {
        if modulus_bits < 32 || modulus_bits % 16 != 0 {
            return Err(CryptoError::InvalidParameters("modulus bits must be a multiple of 16"));
        }

        let exponent = BigUint::from(PUBLIC_EXPONENT);
        let prime_len = modulus_bits / 16;

        let p = search_prime(source, prime_len, &exponent, None)?;
        let q = search_prime(source, prime_len, &exponent, Some(&p))?;

        let private = RsaPrivateKey::from_p_q(p, q, exponent)
            .map_err(|e| CryptoError::KeyAssembly(e.to_string()))?;

        debug_assert_eq!(private.n().bits(), modulus_bits);
        Ok(Self { private })
    }

    /// Public half, safe to register with the room.
    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.private.to_public_key())
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }
}

impl std::fmt::Debug for Keypair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keypair")
            .field("modulus_bits", &self.private.n().bits())
            .field("private", &"<redacted>")
            .finish()
    }
}

/// Draw candidates until one is a suitable prime.
///
/// Every iteration consumes `len` bytes, so a bounded source guarantees
/// termination.
fn search_prime<S: ByteSource>(
    source: &mut S,
    len: usize,
    exponent: &BigUint,
    exclude: Option<&BigUint>,
) -> Result<BigUint, CryptoError> {
    let one = BigUint::from(1u32);
    let zero = BigUint::from(0u32);
    let mut buf = Zeroizing::new(vec![0u8; len]);

    loop {
        source.try_fill(&mut buf)?;
        buf[0] |= 0xC0;
        buf[len - 1] |= 0x01;

        let candidate = BigUint::from_bytes_be(&buf);

        if exclude == Some(&candidate) {
            continue;
        }
        if (&candidate - &one) % exponent == zero {
            continue;
        }
        if probably_prime(&candidate, PRIMALITY_ROUNDS) {
            return Ok(candidate);
        }
    }
}

/// A participant's registered public key.
///
/// Crosses the wire as SubjectPublicKeyInfo PEM.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublicKey(RsaPublicKey);

impl PublicKey {
    /// Parse an SPKI PEM document.
    pub fn from_pem(pem: &str) -> Result<Self, CryptoError> {
        RsaPublicKey::from_public_key_pem(pem.trim())
            .map(Self)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Encode as SPKI PEM with LF line endings.
    pub fn to_pem(&self) -> Result<String, CryptoError> {
        self.0
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
    }

    /// Modulus size in bytes; also the exact length of every ciphertext.
    pub fn modulus_len(&self) -> usize {
        self.0.size()
    }

    /// Modulus size in bits.
    pub fn modulus_bits(&self) -> usize {
        self.0.n().bits()
    }

    pub(crate) fn inner(&self) -> &RsaPublicKey {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use rsa::traits::PrivateKeyParts;

    use super::*;
    use crate::keys::SEED_MATERIAL_LEN;

    const FAST: DerivationParams = DerivationParams { iterations: 100, modulus_bits: 1024 };

    /// Source that replays a fixed byte forever
    struct ConstantSource(u8);

    impl ByteSource for ConstantSource {
        fn try_fill(&mut self, dest: &mut [u8]) -> Result<(), CryptoError> {
            dest.fill(self.0);
            Ok(())
        }
    }

    #[test]
    fn derive_is_deterministic() {
        let salt = KeySalt::new([9; 16]);
        let a = derive_keypair("alice", "hunter22", "room", &salt, &FAST).unwrap();
        let b = derive_keypair("alice", "hunter22", "room", &salt, &FAST).unwrap();

        assert_eq!(a.public_key(), b.public_key());
        assert_eq!(a.private.d(), b.private.d());
        assert_eq!(a.private.primes(), b.private.primes());
    }

    #[test]
    fn different_passwords_produce_different_keys() {
        let salt = KeySalt::new([9; 16]);
        let a = derive_keypair("alice", "hunter22", "room", &salt, &FAST).unwrap();
        let b = derive_keypair("alice", "hunter23", "room", &salt, &FAST).unwrap();

        assert_ne!(a.public_key(), b.public_key());
    }

    #[test]
    fn protocol_key_has_expected_shape() {
        let salt = KeySalt::new([1; 16]);
        let keypair =
            derive_keypair("bob", "correct horse", "room", &salt, &DerivationParams::PROTOCOL)
                .unwrap();

        assert_eq!(keypair.private.n().bits(), 2048);
        assert_eq!(keypair.private.e(), &BigUint::from(PUBLIC_EXPONENT));
        assert_eq!(keypair.public_key().modulus_len(), 256);
        assert!(keypair.private.validate().is_ok());
    }

    #[test]
    fn exhausted_stream_is_reported() {
        let material = SeedMaterial::from_bytes([5; SEED_MATERIAL_LEN]);
        // Room for a handful of candidates only
        let mut stream = DerivedStream::with_limit(&material, 64 * 4);

        let result = Keypair::generate_from_source(&mut stream, 1024);
        assert!(matches!(result, Err(CryptoError::KeyDerivationExhausted { .. })));
    }

    #[test]
    fn rejects_unusable_modulus() {
        let mut source = ConstantSource(0xFF);
        let result = Keypair::generate_from_source(&mut source, 1000);
        assert!(matches!(result, Err(CryptoError::InvalidParameters(_))));
    }

    #[test]
    fn pem_roundtrip() {
        let material = SeedMaterial::from_bytes([2; SEED_MATERIAL_LEN]);
        let mut stream = DerivedStream::new(&material);
        let keypair = Keypair::generate_from_source(&mut stream, 1024).unwrap();

        let pem = keypair.public_key().to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN PUBLIC KEY-----"));

        let parsed = PublicKey::from_pem(&pem).unwrap();
        assert_eq!(parsed, keypair.public_key());
        assert_eq!(parsed.modulus_bits(), 1024);
        assert_eq!(parsed.modulus_len(), 128);
    }

    #[test]
    fn garbage_pem_is_rejected() {
        let pem = "-----BEGIN PUBLIC KEY-----\nnope\n-----END PUBLIC KEY-----";
        let result = PublicKey::from_pem(pem);
        assert!(matches!(result, Err(CryptoError::InvalidPublicKey(_))));
    }

    #[test]
    fn debug_output_hides_private_key() {
        let material = SeedMaterial::from_bytes([4; SEED_MATERIAL_LEN]);
        let mut stream = DerivedStream::new(&material);
        let keypair = Keypair::generate_from_source(&mut stream, 1024).unwrap();

        let debug = format!("{keypair:?}");
        assert!(debug.contains("<redacted>"));
        assert!(debug.contains("1024"));
    }
}
