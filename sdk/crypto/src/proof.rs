//! Groth16 Proof Envelope
//!
//! The snarkjs-compatible wire form shipped to verifier programs and remote
//! provers:
//!
//! ```json
//! {
//!   "protocol": "groth16",
//!   "curve": "bn128",
//!   "pi_a": ["…", "…", "1"],
//!   "pi_b": [["…", "…"], ["…", "…"], ["1", "0"]],
//!   "pi_c": ["…", "…", "1"],
//!   "public_signals": { "root": "…", "nullifierHash": "…" }
//! }
//! ```
//!
//! Elements are decimal field-element strings. The key order of
//! `public_signals` is part of the public contract for a circuit, so the map
//! preserves insertion order through (de)serialization.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{CryptoError, Result};

/// Fixed protocol tag.
pub const PROOF_PROTOCOL: &str = "groth16";
/// Fixed curve tag.
pub const PROOF_CURVE: &str = "bn128";

/// A Groth16 proof in projective snarkjs layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groth16Proof {
    pub protocol: String,
    pub curve: String,
    pub pi_a: [String; 3],
    pub pi_b: [[String; 2]; 3],
    pub pi_c: [String; 3],
    pub public_signals: PublicSignals,
}

impl Groth16Proof {
    /// Assemble an envelope with the fixed protocol and curve tags.
    pub fn new(
        pi_a: [String; 3],
        pi_b: [[String; 2]; 3],
        pi_c: [String; 3],
        public_signals: PublicSignals,
    ) -> Self {
        Self {
            protocol: PROOF_PROTOCOL.to_string(),
            curve: PROOF_CURVE.to_string(),
            pi_a,
            pi_b,
            pi_c,
            public_signals,
        }
    }
}

/// An insertion-ordered name → decimal-string signal map.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PublicSignals(Vec<(String, String)>);

impl PublicSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a signal, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(k, _)| *k == name) {
            slot.1 = value;
        } else {
            self.0.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, String)> for PublicSignals {
    fn from_iter<T: IntoIterator<Item = (String, String)>>(iter: T) -> Self {
        let mut signals = Self::new();
        for (k, v) in iter {
            signals.insert(k, v);
        }
        signals
    }
}

impl Serialize for PublicSignals {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in &self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PublicSignals {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = PublicSignals;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of signal names to decimal strings")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((k, v)) = access.next_entry::<String, String>()? {
                    entries.push((k, v));
                }
                Ok(PublicSignals(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// Encode a proof envelope as UTF-8 JSON bytes.
pub fn serialize_proof(proof: &Groth16Proof) -> Result<Vec<u8>> {
    serde_json::to_vec(proof)
        .map_err(|e| CryptoError::InvalidFormat(format!("proof encode: {e}")))
}

/// Decode a proof envelope, enforcing the protocol/curve tags and element
/// arities.
pub fn deserialize_proof(bytes: &[u8]) -> Result<Groth16Proof> {
    let proof: Groth16Proof = serde_json::from_slice(bytes)
        .map_err(|e| CryptoError::InvalidFormat(format!("proof decode: {e}")))?;

    if proof.protocol != PROOF_PROTOCOL {
        return Err(CryptoError::InvalidFormat(format!(
            "unexpected protocol tag {:?}",
            proof.protocol
        )));
    }
    if proof.curve != PROOF_CURVE {
        return Err(CryptoError::InvalidFormat(format!(
            "unexpected curve tag {:?}",
            proof.curve
        )));
    }

    let elements = proof
        .pi_a
        .iter()
        .chain(proof.pi_b.iter().flatten())
        .chain(proof.pi_c.iter());
    for e in elements {
        if e.is_empty() || !e.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CryptoError::InvalidFormat(format!(
                "proof element is not a decimal string: {e:?}"
            )));
        }
    }

    Ok(proof)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldElement;

    fn sample_proof() -> Groth16Proof {
        let mut signals = PublicSignals::new();
        signals.insert("root", FieldElement::from_u64(11).to_decimal());
        signals.insert("nullifierHash", FieldElement::from_u64(22).to_decimal());
        signals.insert("amount", "5000000");

        Groth16Proof::new(
            ["101".into(), "202".into(), "1".into()],
            [
                ["1".into(), "2".into()],
                ["3".into(), "4".into()],
                ["1".into(), "0".into()],
            ],
            ["303".into(), "404".into(), "1".into()],
            signals,
        )
    }

    #[test]
    fn test_roundtrip() {
        let proof = sample_proof();
        let bytes = serialize_proof(&proof).unwrap();
        let back = deserialize_proof(&bytes).unwrap();
        assert_eq!(back, proof);
    }

    #[test]
    fn test_signal_order_preserved() {
        let proof = sample_proof();
        let bytes = serialize_proof(&proof).unwrap();
        let back = deserialize_proof(&bytes).unwrap();

        let keys: Vec<&str> = back.public_signals.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["root", "nullifierHash", "amount"]);
    }

    #[test]
    fn test_rejects_wrong_tags() {
        let mut proof = sample_proof();
        proof.protocol = "plonk".into();
        let bytes = serde_json::to_vec(&proof).unwrap();
        assert!(deserialize_proof(&bytes).is_err());

        let mut proof = sample_proof();
        proof.curve = "bls12-381".into();
        let bytes = serde_json::to_vec(&proof).unwrap();
        assert!(deserialize_proof(&bytes).is_err());
    }

    #[test]
    fn test_rejects_non_decimal_elements() {
        let mut proof = sample_proof();
        proof.pi_a[0] = "0xdead".into();
        let bytes = serde_json::to_vec(&proof).unwrap();
        assert!(deserialize_proof(&bytes).is_err());
    }

    #[test]
    fn test_rejects_wrong_arity() {
        // pi_b with 2 rows instead of 3 fails at the serde layer
        let json = serde_json::json!({
            "protocol": "groth16",
            "curve": "bn128",
            "pi_a": ["1", "2", "1"],
            "pi_b": [["1", "2"], ["3", "4"]],
            "pi_c": ["5", "6", "1"],
            "public_signals": {}
        });
        let bytes = serde_json::to_vec(&json).unwrap();
        assert!(deserialize_proof(&bytes).is_err());
    }

    #[test]
    fn test_insert_replaces() {
        let mut signals = PublicSignals::new();
        signals.insert("root", "1");
        signals.insert("root", "2");
        assert_eq!(signals.len(), 1);
        assert_eq!(signals.get("root"), Some("2"));
    }
}
