use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ClientError;

/// A 20-byte account or contract address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase `0x`-prefixed hex form, as sent over JSON-RPC
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let raw = raw
            .strip_prefix("0x")
            .or_else(|| raw.strip_prefix("0X"))
            .unwrap_or(raw);
        if raw.len() != 40 {
            return Err(ClientError::Validation(format!(
                "invalid address '{s}': expected 40 hex characters, got {}",
                raw.len()
            )));
        }
        let bytes = hex::decode(raw)
            .map_err(|e| ClientError::Validation(format!("invalid address '{s}': {e}")))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_hex())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_case_with_and_without_prefix() {
        let a: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let b: Address = "5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed");
    }

    #[test]
    fn rejects_wrong_length_and_non_hex() {
        assert!("0x1234".parse::<Address>().is_err());
        let bad = "0xzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzzz";
        assert!(matches!(
            bad.parse::<Address>(),
            Err(ClientError::Validation(_))
        ));
    }

    #[test]
    fn serde_uses_hex_string() {
        let a: Address = "0x00000000000000000000000000000000000000ff".parse().unwrap();
        let json = serde_json::to_string(&a).unwrap();
        assert_eq!(json, "\"0x00000000000000000000000000000000000000ff\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, a);
    }
}
