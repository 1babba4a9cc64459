//! Validated identifiers and credentials
//!
//! Shape checks happen here, before any cryptographic work. A value of one of
//! these types is always well-formed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::error::InputError;

/// Maximum username length in characters
pub const MAX_USERNAME_CHARS: usize = 32;

/// Minimum password length in characters
pub const MIN_PASSWORD_CHARS: usize = 6;

/// Maximum room name length in characters
pub const MAX_ROOM_NAME_CHARS: usize = 64;

/// Participant name, unique and case-sensitive within a room.
///
/// Sanitized on construction: surrounding whitespace is trimmed, control
/// characters are rejected, length is 1..=32 characters.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Sanitize and validate a raw username.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(InputError::EmptyUsername);
        }
        if trimmed.chars().count() > MAX_USERNAME_CHARS {
            return Err(InputError::UsernameTooLong { max: MAX_USERNAME_CHARS });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(InputError::ControlCharacter { field: "username" });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Username {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

/// Participant or host password.
///
/// Used verbatim (no trimming) and zeroized on drop.
#[derive(Clone)]
pub struct Password(Zeroizing<String>);

impl Password {
    /// Validate a raw password.
    pub fn new(raw: &str) -> Result<Self, InputError> {
        if raw.chars().count() < MIN_PASSWORD_CHARS {
            return Err(InputError::PasswordTooShort { min: MIN_PASSWORD_CHARS });
        }
        Ok(Self(Zeroizing::new(raw.to_string())))
    }

    /// The password text.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password(<redacted>)")
    }
}

/// Display name of a room.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomName(String);

impl RoomName {
    /// Sanitize and validate a raw room name.
    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let trimmed = raw.trim();
        let len = trimmed.chars().count();
        if len == 0 || len > MAX_ROOM_NAME_CHARS {
            return Err(InputError::InvalidRoomName { max: MAX_ROOM_NAME_CHARS });
        }
        if trimmed.chars().any(char::is_control) {
            return Err(InputError::ControlCharacter { field: "room name" });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The sanitized name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for RoomName {
    type Error = InputError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomName> for String {
    fn from(value: RoomName) -> Self {
        value.0
    }
}

/// 128-bit room identifier.
///
/// Its text form (32 lowercase hex digits) is also the room component of the
/// key derivation seed, so it must never change once issued.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(u128);

impl RoomId {
    /// Wrap a raw identifier.
    pub const fn new(raw: u128) -> Self {
        Self(raw)
    }

    /// Raw identifier.
    pub fn as_u128(&self) -> u128 {
        self.0
    }

    /// Big-endian bytes, used as storage keys.
    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

impl FromStr for RoomId {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != 32 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InputError::InvalidRoomId(s.to_string()));
        }
        u128::from_str_radix(s, 16)
            .map(Self)
            .map_err(|_| InputError::InvalidRoomId(s.to_string()))
    }
}
