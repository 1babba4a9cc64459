//! Per-participant key salt

use base64::{Engine, engine::general_purpose::STANDARD};

use crate::CryptoError;

/// Length of a key salt in bytes
pub const KEY_SALT_LEN: usize = 16;

/// Random value mixed into PBKDF2 so that two participants sharing a
/// password still derive different keys.
///
/// Issued once, on the participant's first registration attempt, and never
/// changed afterwards. Not secret: the server hands it back at login.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct KeySalt([u8; KEY_SALT_LEN]);

impl KeySalt {
    /// Wrap caller-provided random bytes.
    pub fn new(bytes: [u8; KEY_SALT_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CryptoError> {
        let array: [u8; KEY_SALT_LEN] = bytes
            .try_into()
            .map_err(|_| CryptoError::InvalidSalt { expected: KEY_SALT_LEN, got: bytes.len() })?;
        Ok(Self(array))
    }

    /// Parse the standard base64 text form.
    pub fn from_base64(text: &str) -> Result<Self, CryptoError> {
        let bytes = STANDARD.decode(text.trim()).map_err(|_| CryptoError::InvalidEncoding)?;
        Self::from_slice(&bytes)
    }

    /// Standard base64 text form.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Raw salt bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_SALT_LEN] {
        &self.0
    }
}

impl std::fmt::Display for KeySalt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_base64())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for KeySalt {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base64())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for KeySalt {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = <String as serde::Deserialize>::deserialize(deserializer)?;
        Self::from_base64(&text).map_err(serde::de::Error::custom)
    }
}
