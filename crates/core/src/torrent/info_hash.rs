use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Length in bytes of a BitTorrent v1 info-hash.
pub const INFO_HASH_LEN: usize = 20;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InfoHashError {
    #[error("info-hash must be {INFO_HASH_LEN} bytes, got {0}")]
    InvalidLength(usize),

    #[error("invalid info-hash hex: {0}")]
    InvalidHex(String),
}

/// SHA-1 info-hash identifying a torrent's content.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InfoHash([u8; INFO_HASH_LEN]);

impl InfoHash {
    pub fn new(bytes: [u8; INFO_HASH_LEN]) -> Self {
        Self(bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, InfoHashError> {
        let array: [u8; INFO_HASH_LEN] = bytes
            .try_into()
            .map_err(|_| InfoHashError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl FromStr for InfoHash {
    type Err = InfoHashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s.trim()).map_err(|e| InfoHashError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl Serialize for InfoHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for InfoHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HASH_HEX: &str = "c9e15763f722f23e98a29decdfae341b98d53056";

    #[test]
    fn test_parse_and_display() {
        let hash: InfoHash = HASH_HEX.parse().unwrap();
        assert_eq!(hash.to_string(), HASH_HEX);
        assert_eq!(hash.as_bytes().len(), INFO_HASH_LEN);
    }

    #[test]
    fn test_parse_uppercase_hex() {
        let hash: InfoHash = HASH_HEX.to_uppercase().parse().unwrap();
        assert_eq!(hash.to_hex(), HASH_HEX);
    }

    #[test]
    fn test_from_slice_wrong_length() {
        let result = InfoHash::from_slice(&[0u8; 32]);
        assert_eq!(result, Err(InfoHashError::InvalidLength(32)));
    }

    #[test]
    fn test_parse_invalid_hex() {
        let result = "zz".repeat(20).parse::<InfoHash>();
        assert!(matches!(result, Err(InfoHashError::InvalidHex(_))));
    }

    #[test]
    fn test_serde_as_hex_string() {
        let hash: InfoHash = HASH_HEX.parse().unwrap();
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, format!("\"{}\"", HASH_HEX));

        let parsed: InfoHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }
}
