//! BN254 Scalar Field Elements
//!
//! Every hash input, commitment, nullifier, and Merkle node in the toolkit is
//! a canonical element of the BN254 scalar field
//! (r = 21888242871839275222246405745257275088548364400416034343698204186575808495617).
//!
//! Byte encoding is 32 bytes big-endian. Text encodings are decimal (the note
//! and proof wire formats) and 0x-prefixed hex.

use ark_bn254::Fr;
use ark_ff::{BigInteger, PrimeField};
use ark_std::UniformRand;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CryptoError, Result};

/// A canonical BN254 scalar field element.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FieldElement(Fr);

impl FieldElement {
    /// The additive identity.
    pub fn zero() -> Self {
        Self(Fr::from(0u64))
    }

    /// Draw a uniformly random field element.
    pub fn random() -> Self {
        Self(Fr::rand(&mut OsRng))
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Fr::from(value))
    }

    /// Interpret bytes as a big-endian integer, reduced modulo the field order.
    pub fn from_bytes_be(bytes: &[u8]) -> Self {
        Self(Fr::from_be_bytes_mod_order(bytes))
    }

    /// Canonical 32-byte big-endian encoding.
    pub fn to_bytes_be(&self) -> [u8; 32] {
        let repr = self.0.into_bigint().to_bytes_be();
        let mut out = [0u8; 32];
        out[32 - repr.len()..].copy_from_slice(&repr);
        out
    }

    /// 0x-prefixed lowercase hex of the canonical encoding.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes_be()))
    }

    /// Parse a hex string (with or without 0x prefix) into a canonical element.
    ///
    /// Rejects malformed hex, over-long values, and non-canonical scalars.
    pub fn from_hex(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let raw = hex::decode(digits)
            .map_err(|e| CryptoError::InvalidFormat(format!("bad hex: {e}")))?;
        if raw.len() > 32 {
            return Err(CryptoError::InvalidFormat(format!(
                "hex value is {} bytes, expected at most 32",
                raw.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes[32 - raw.len()..].copy_from_slice(&raw);
        if !is_canonical_bytes(&bytes) {
            return Err(CryptoError::InvalidFormat(
                "value not below the field modulus".into(),
            ));
        }
        Ok(Self::from_bytes_be(&bytes))
    }

    /// Decimal text form, as used by the note and proof wire formats.
    pub fn to_decimal(&self) -> String {
        self.0.to_string()
    }

    /// Parse a decimal big-integer string.
    pub fn from_decimal(s: &str) -> Result<Self> {
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CryptoError::InvalidFormat(format!(
                "not a decimal big integer: {s:?}"
            )));
        }
        Fr::from_str(s)
            .map(Self)
            .map_err(|_| CryptoError::InvalidFormat(format!("unparseable decimal: {s:?}")))
    }

    pub fn inner(&self) -> Fr {
        self.0
    }
}

impl From<Fr> for FieldElement {
    fn from(value: Fr) -> Self {
        Self(value)
    }
}

impl From<u64> for FieldElement {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl fmt::Display for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_decimal())
    }
}

impl fmt::Debug for FieldElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FieldElement({})", self.to_hex())
    }
}

impl Serialize for FieldElement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for FieldElement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FieldElement::from_decimal(&s).map_err(serde::de::Error::custom)
    }
}

/// Check that a 32-byte big-endian value is strictly below the field modulus.
pub fn is_canonical_bytes(bytes: &[u8; 32]) -> bool {
    let modulus = Fr::MODULUS.to_bytes_be();
    bytes.as_slice() < modulus.as_slice()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_is_canonical() {
        for _ in 0..32 {
            let x = FieldElement::random();
            assert!(is_canonical_bytes(&x.to_bytes_be()));
        }
    }

    #[test]
    fn test_bytes_roundtrip() {
        let x = FieldElement::from_u64(0xDEADBEEF);
        let bytes = x.to_bytes_be();
        assert_eq!(FieldElement::from_bytes_be(&bytes), x);
        assert_eq!(bytes.len(), 32);
    }

    #[test]
    fn test_bytes_reduce_mod_order() {
        // All-0xFF is above the modulus and must reduce, not fail
        let reduced = FieldElement::from_bytes_be(&[0xFFu8; 32]);
        assert!(is_canonical_bytes(&reduced.to_bytes_be()));
    }

    #[test]
    fn test_hex_roundtrip() {
        let x = FieldElement::random();
        let parsed = FieldElement::from_hex(&x.to_hex()).unwrap();
        assert_eq!(parsed, x);
    }

    #[test]
    fn test_hex_rejects_garbage() {
        assert!(FieldElement::from_hex("0xzz").is_err());
        // 33 bytes
        assert!(FieldElement::from_hex(&"ab".repeat(33)).is_err());
        // exactly the modulus
        let modulus_hex = hex::encode(Fr::MODULUS.to_bytes_be());
        assert!(FieldElement::from_hex(&modulus_hex).is_err());
    }

    #[test]
    fn test_decimal_roundtrip() {
        let x = FieldElement::from_u64(123_456_789);
        assert_eq!(x.to_decimal(), "123456789");
        assert_eq!(FieldElement::from_decimal("123456789").unwrap(), x);
    }

    #[test]
    fn test_decimal_rejects_non_digits() {
        assert!(FieldElement::from_decimal("").is_err());
        assert!(FieldElement::from_decimal("12ab").is_err());
        assert!(FieldElement::from_decimal("-5").is_err());
    }

    #[test]
    fn test_modulus_not_canonical() {
        let modulus: [u8; 32] = Fr::MODULUS.to_bytes_be().try_into().unwrap();
        assert!(!is_canonical_bytes(&modulus));
        assert!(is_canonical_bytes(&[0u8; 32]));
    }

    #[test]
    fn test_serde_as_decimal_string() {
        let x = FieldElement::from_u64(42);
        let json = serde_json::to_string(&x).unwrap();
        assert_eq!(json, "\"42\"");
        let back: FieldElement = serde_json::from_str(&json).unwrap();
        assert_eq!(back, x);
    }
}
