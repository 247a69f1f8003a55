//! X25519 Key Handling
//!
//! Raw-byte X25519 per RFC 7748: secrets are 32 clamped bytes, publics are
//! the scalar product with the standard base point. Byte-level access (rather
//! than the dalek wrapper types) keeps the clamp law testable and the keys
//! serializable into session handshakes.

use rand::rngs::OsRng;
use rand::RngCore;
use x25519_dalek::{x25519, X25519_BASEPOINT_BYTES};

/// Apply RFC 7748 clamping: clear the three lowest bits of byte 0, clear the
/// top bit of byte 31, set the second-highest bit of byte 31.
pub fn clamp_secret(mut secret: [u8; 32]) -> [u8; 32] {
    secret[0] &= 0xF8;
    secret[31] &= 0x7F;
    secret[31] |= 0x40;
    secret
}

/// Generate a fresh clamped secret key.
pub fn generate_secret_key() -> [u8; 32] {
    let mut secret = [0u8; 32];
    OsRng.fill_bytes(&mut secret);
    clamp_secret(secret)
}

/// Derive the public key for a secret.
pub fn get_public_key(secret: &[u8; 32]) -> [u8; 32] {
    x25519(*secret, X25519_BASEPOINT_BYTES)
}

/// Diffie-Hellman: both sides compute the same 32 bytes.
pub fn get_shared_secret(my_secret: &[u8; 32], their_public: &[u8; 32]) -> [u8; 32] {
    x25519(*my_secret, *their_public)
}

/// A clamped secret with its derived public key.
#[derive(Clone)]
pub struct X25519KeyPair {
    pub secret: [u8; 32],
    pub public: [u8; 32],
}

impl X25519KeyPair {
    pub fn generate() -> Self {
        let secret = generate_secret_key();
        let public = get_public_key(&secret);
        Self { secret, public }
    }

    pub fn from_secret(secret: [u8; 32]) -> Self {
        let secret = clamp_secret(secret);
        let public = get_public_key(&secret);
        Self { secret, public }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_law() {
        for _ in 0..16 {
            let sk = generate_secret_key();
            assert_eq!(sk[0] & 0x07, 0);
            assert_eq!(sk[31] & 0x80, 0);
            assert_eq!(sk[31] & 0x40, 0x40);
        }
    }

    #[test]
    fn test_public_matches_dalek_derivation() {
        let pair = X25519KeyPair::generate();
        assert_eq!(pair.public, get_public_key(&pair.secret));
    }

    #[test]
    fn test_ecdh_symmetry() {
        let alice = X25519KeyPair::generate();
        let bob = X25519KeyPair::generate();

        let ab = get_shared_secret(&alice.secret, &bob.public);
        let ba = get_shared_secret(&bob.secret, &alice.public);
        assert_eq!(ab, ba);

        let charlie = X25519KeyPair::generate();
        let ac = get_shared_secret(&alice.secret, &charlie.public);
        assert_ne!(ab, ac);
    }
}
