//! Per-device identity codes.
//!
//! Every device participating in a tournament carries a short stable code.
//! The host matches it against the officials/referees roster to decide which
//! mutations a connection may submit. Codes are compared case-insensitively
//! and stored uppercase.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Length of a device code.
pub const DEVICE_CODE_LEN: usize = 5;

/// Alphabet for generated codes. 0/O and 1/I are left out so a code can be
/// read aloud at the scoring desk without transcription mistakes.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// A 5-character code identifying a physical device.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    /// Generate a fresh random code.
    pub fn generate() -> Self {
        let code: String = (0..DEVICE_CODE_LEN)
            .map(|_| CODE_ALPHABET[fastrand::usize(..CODE_ALPHABET.len())] as char)
            .collect();
        Self(code)
    }

    /// Load the device's persisted code, generating and writing one on first
    /// call so the id stays stable for the app install.
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self, DeviceIdError> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => Ok(contents.trim().parse()?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let id = Self::generate();
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::write(path, id.as_str())?;
                Ok(id)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for DeviceId {
    type Err = DeviceIdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != DEVICE_CODE_LEN {
            return Err(DeviceIdParseError::WrongLength(s.len()));
        }
        if let Some(c) = s.chars().find(|c| !c.is_ascii_alphanumeric()) {
            return Err(DeviceIdParseError::InvalidChar(c));
        }
        Ok(Self(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for DeviceId {
    type Error = DeviceIdParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}

/// Error parsing a device code.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeviceIdParseError {
    #[error("device code must be {DEVICE_CODE_LEN} characters, got {0}")]
    WrongLength(usize),
    #[error("device code contains invalid character {0:?}")]
    InvalidChar(char),
}

/// Error loading or persisting a device code.
#[derive(Debug, thiserror::Error)]
pub enum DeviceIdError {
    #[error(transparent)]
    Parse(#[from] DeviceIdParseError),
    #[error("device code file: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case() {
        let a: DeviceId = "ab2cd".parse().unwrap();
        let b: DeviceId = "AB2CD".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "AB2CD");
    }

    #[test]
    fn rejects_wrong_length() {
        assert!(matches!(
            "ABCD".parse::<DeviceId>(),
            Err(DeviceIdParseError::WrongLength(4))
        ));
        assert!(matches!(
            "ABCDEF".parse::<DeviceId>(),
            Err(DeviceIdParseError::WrongLength(6))
        ));
    }

    #[test]
    fn rejects_non_alphanumeric() {
        assert!(matches!(
            "AB-CD".parse::<DeviceId>(),
            Err(DeviceIdParseError::InvalidChar('-'))
        ));
    }

    #[test]
    fn generated_codes_are_valid() {
        for _ in 0..100 {
            let id = DeviceId::generate();
            let reparsed: DeviceId = id.as_str().parse().unwrap();
            assert_eq!(id, reparsed);
        }
    }

    #[test]
    fn load_or_generate_is_stable() {
        let dir = std::env::temp_dir().join(format!("piste-id-{}", fastrand::u64(..)));
        let path = dir.join("device_id");
        let first = DeviceId::load_or_generate(&path).unwrap();
        let second = DeviceId::load_or_generate(&path).unwrap();
        assert_eq!(first, second);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn roundtrip_serde() {
        let id = DeviceId::generate();
        let json = serde_json::to_string(&id).unwrap();
        let back: DeviceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
