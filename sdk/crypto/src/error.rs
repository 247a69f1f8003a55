//! Error definitions for the cryptographic primitives.

use thiserror::Error;

/// Errors raised by the field, hash, tree, and envelope layers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Input rejected before any computation (empty hash input, bad width).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A textual or binary encoding could not be parsed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The Merkle tree has no free leaf positions left.
    #[error("merkle tree full: capacity {0} reached")]
    TreeFull(u64),

    /// The requested leaf index has not been inserted.
    #[error("leaf index {0} not found")]
    NotFound(u64),
}

/// Result type for cryptographic operations.
pub type Result<T> = std::result::Result<T, CryptoError>;
