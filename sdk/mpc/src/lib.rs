//! Veilkit MPC Encryption
//!
//! The client side of a confidential-computation handshake:
//!
//! 1. Generate an X25519 keypair (RFC 7748 clamping).
//! 2. Derive a shared secret with the MPC cluster's ("MXE") public key.
//! 3. Encrypt numeric values under a key derived from the shared secret and a
//!    fresh random nonce, so equal plaintexts never produce equal ciphertexts.
//!
//! Values cross this boundary as fixed-width little-endian integers.

pub mod encryption;
pub mod keys;
pub mod serialize;

pub use encryption::{EncryptedValue, MxeCipher, CSPL_VALUE_WIDTH, VALUE_WIDTH};
pub use keys::{
    clamp_secret, generate_secret_key, get_public_key, get_shared_secret, X25519KeyPair,
};
pub use serialize::{deserialize_le, serialize_le};
