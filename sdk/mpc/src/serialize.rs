//! Fixed-Width Little-Endian Integer Encoding
//!
//! MPC circuits consume values as fixed-width byte arrays, so the width is an
//! explicit parameter and overflow is an error, never a truncation.

use num_bigint::BigUint;

use veilkit_crypto::{CryptoError, Result};

/// Encode `value` as exactly `width` little-endian bytes.
///
/// Fails when the value does not fit in `width` bytes.
pub fn serialize_le(value: &BigUint, width: usize) -> Result<Vec<u8>> {
    let mut bytes = value.to_bytes_le();
    if bytes.len() > width {
        return Err(CryptoError::InvalidInput(format!(
            "value needs {} bytes, width is {width}",
            bytes.len()
        )));
    }
    bytes.resize(width, 0);
    Ok(bytes)
}

/// Inverse of [`serialize_le`]: interpret bytes as a little-endian integer.
pub fn deserialize_le(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_le(bytes)
}
