//! Chain address type and hex helpers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::ContracterError;

/// A 20-byte chain account address.
///
/// Parsed from and displayed as lowercase 0x-prefixed hex. Comparison is
/// byte-wise, so mixed-case (checksummed) input compares equal after parsing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; 20]);

impl Address {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, ContracterError> {
        if bytes.len() != 20 {
            return Err(ContracterError::Validation(format!(
                "address must be 20 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 20];
        out.copy_from_slice(bytes);
        Ok(Address(out))
    }
}

impl FromStr for Address {
    type Err = ContracterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex_part = s
            .trim()
            .strip_prefix("0x")
            .or_else(|| s.trim().strip_prefix("0X"))
            .ok_or_else(|| {
                ContracterError::Validation("address must be 0x-prefixed hex".into())
            })?;
        let bytes = hex::decode(hex_part)
            .map_err(|e| ContracterError::Validation(format!("invalid address hex: {}", e)))?;
        Address::from_slice(&bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl TryFrom<String> for Address {
    type Error = ContracterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Address> for String {
    fn from(a: Address) -> Self {
        a.to_string()
    }
}

/// Decode a 0x-prefixed hex payload (contract bytecode, call data).
pub fn decode_hex_payload(value: &str) -> Result<Vec<u8>, ContracterError> {
    let trimmed = value.trim();
    let hex_part = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    hex::decode(hex_part).map_err(|e| ContracterError::Validation(format!("invalid hex: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display_roundtrip() {
        let addr: Address = "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse().unwrap();
        assert_eq!(addr.to_string(), "0x6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0");
    }

    #[test]
    fn test_checksummed_input_compares_equal() {
        let a: Address = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed".parse().unwrap();
        let b: Address = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed".parse().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0".parse::<Address>().is_err());
        assert!("0x1234".parse::<Address>().is_err());
        assert!("0xzz".parse::<Address>().is_err());
    }

    #[test]
    fn test_decode_hex_payload() {
        assert_eq!(decode_hex_payload("0x6080").unwrap(), vec![0x60, 0x80]);
        assert_eq!(decode_hex_payload("6080").unwrap(), vec![0x60, 0x80]);
        assert!(decode_hex_payload("0x608").is_err());
    }
}
