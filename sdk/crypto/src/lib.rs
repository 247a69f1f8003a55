//! Veilkit Crypto
//!
//! SNARK-friendly primitives shared by every privacy backend:
//!
//! - BN254 scalar field wrapper with canonical byte/hex/decimal encodings
//! - Poseidon hashing with circom-compatible parameters
//! - Groth16 proof envelope with the snarkjs wire layout
//!
//! The Poseidon parameter set is a process-wide constant. Commitments,
//! nullifiers, and Merkle nodes produced anywhere in the workspace combine
//! only because every caller goes through this crate.

pub mod error;
pub mod field;
pub mod poseidon;
pub mod proof;

pub use error::{CryptoError, Result};
pub use field::FieldElement;
pub use poseidon::{poseidon_hash, poseidon_hash_many, poseidon_hash_single};
pub use proof::{deserialize_proof, serialize_proof, Groth16Proof, PublicSignals};

/// Re-export the underlying field type for callers that need arkworks interop.
pub use ark_bn254::Fr;
