//! Authenticated Value Encryption for the MXE
//!
//! ```text
//! shared = X25519(our_secret, mxe_public)
//! nonce  = 16 random bytes
//! key ‖ iv = HKDF-SHA256(salt = nonce, ikm = shared, info = "veilkit-mxe-v1")
//! ciphertext = ChaCha20-Poly1305(key, iv, serialize_le(value, width))
//! ```
//!
//! The per-call random nonce makes two encryptions of the same value distinct
//! with overwhelming probability.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use num_bigint::BigUint;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use veilkit_crypto::{CryptoError, Result};

use crate::keys::{get_shared_secret, X25519KeyPair};
use crate::serialize::{deserialize_le, serialize_le};

/// Plaintext width for general field-sized values.
pub const VALUE_WIDTH: usize = 32;

/// Plaintext width for C-SPL token amounts (`u64`, zero-padded LE).
pub const CSPL_VALUE_WIDTH: usize = 8;

const NONCE_LEN: usize = 16;
const HKDF_INFO: &[u8] = b"veilkit-mxe-v1";

/// Ciphertext plus the nonce that keyed it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedValue {
    pub ciphertext: Vec<u8>,
    pub nonce: [u8; NONCE_LEN],
}

/// Encrypts values for an MPC execution environment ("MXE").
///
/// Holds our ephemeral keypair and the MXE public key; every encryption
/// derives a one-off AEAD key from the shared secret and a fresh nonce.
pub struct MxeCipher {
    keypair: X25519KeyPair,
    mxe_public: [u8; 32],
}

impl MxeCipher {
    /// Create a cipher toward `mxe_public` with a fresh keypair.
    pub fn new(mxe_public: [u8; 32]) -> Self {
        Self {
            keypair: X25519KeyPair::generate(),
            mxe_public,
        }
    }

    /// Create with an existing keypair (session resumption, tests).
    pub fn with_keypair(keypair: X25519KeyPair, mxe_public: [u8; 32]) -> Self {
        Self { keypair, mxe_public }
    }

    /// Our public key, to be shared with the MXE.
    pub fn public_key(&self) -> [u8; 32] {
        self.keypair.public
    }

    /// key ‖ iv from the shared secret and a nonce.
    fn derive_aead(&self, nonce: &[u8; NONCE_LEN]) -> (ChaCha20Poly1305, [u8; 12]) {
        let shared = get_shared_secret(&self.keypair.secret, &self.mxe_public);
        let hk = Hkdf::<Sha256>::new(Some(nonce), &shared);
        let mut okm = [0u8; 44];
        hk.expand(HKDF_INFO, &mut okm)
            .expect("HKDF expansion failed");

        let key = Key::from_slice(&okm[..32]);
        let iv: [u8; 12] = okm[32..44].try_into().expect("fixed slice length");
        (ChaCha20Poly1305::new(key), iv)
    }

    fn encrypt_width(&self, value: &BigUint, width: usize) -> Result<EncryptedValue> {
        let plaintext = serialize_le(value, width)?;

        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let (aead, iv) = self.derive_aead(&nonce);
        let ciphertext = aead
            .encrypt(Nonce::from_slice(&iv), plaintext.as_slice())
            .map_err(|_| CryptoError::InvalidInput("value encryption failed".into()))?;

        Ok(EncryptedValue { ciphertext, nonce })
    }

    /// Encrypt a field-sized value (32-byte plaintext).
    pub fn encrypt(&self, value: &BigUint) -> Result<EncryptedValue> {
        self.encrypt_width(value, VALUE_WIDTH)
    }

    /// Encrypt a token amount with the C-SPL program's fixed width.
    pub fn encrypt_for_cspl(&self, value: u64) -> Result<EncryptedValue> {
        self.encrypt_width(&BigUint::from(value), CSPL_VALUE_WIDTH)
    }

    /// Decrypt a value previously produced by this cipher.
    pub fn decrypt(&self, encrypted: &EncryptedValue) -> Result<BigUint> {
        let (aead, iv) = self.derive_aead(&encrypted.nonce);
        let plaintext = aead
            .decrypt(Nonce::from_slice(&iv), encrypted.ciphertext.as_slice())
            .map_err(|_| {
                CryptoError::InvalidFormat("value decryption failed (bad key or mac)".into())
            })?;
        Ok(deserialize_le(&plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher_pair() -> (MxeCipher, [u8; 32]) {
        let mxe = X25519KeyPair::generate();
        (MxeCipher::new(mxe.public), mxe.secret)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let (cipher, _) = cipher_pair();
        let value = BigUint::from(123_456_789_u64);

        let encrypted = cipher.encrypt(&value).unwrap();
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), value);
    }

    #[test]
    fn test_same_value_distinct_ciphertexts() {
        let (cipher, _) = cipher_pair();
        let value = BigUint::from(42u64);

        let a = cipher.encrypt(&value).unwrap();
        let b = cipher.encrypt(&value).unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.ciphertext, b.ciphertext);
    }

    #[test]
    fn test_cspl_width() {
        let (cipher, _) = cipher_pair();
        let encrypted = cipher.encrypt_for_cspl(1_000_000).unwrap();
        // 8-byte plaintext + 16-byte Poly1305 tag
        assert_eq!(encrypted.ciphertext.len(), CSPL_VALUE_WIDTH + 16);
        assert_eq!(
            cipher.decrypt(&encrypted).unwrap(),
            BigUint::from(1_000_000u64)
        );
    }

    #[test]
    fn test_oversized_value_rejected() {
        let (cipher, _) = cipher_pair();
        let too_big = BigUint::from(1u8) << 256u32;
        assert!(cipher.encrypt(&too_big).is_err());
    }

    #[test]
    fn test_tampered_ciphertext_rejected() {
        let (cipher, _) = cipher_pair();
        let mut encrypted = cipher.encrypt(&BigUint::from(7u64)).unwrap();
        encrypted.ciphertext[0] ^= 1;
        assert!(cipher.decrypt(&encrypted).is_err());
    }

    #[test]
    fn test_mxe_side_derives_same_secret() {
        // The MXE holds its secret and our public key; ECDH symmetry gives it
        // the same shared secret our cipher keys from
        let mxe = X25519KeyPair::generate();
        let client = X25519KeyPair::generate();
        let cipher = MxeCipher::with_keypair(client.clone(), mxe.public);

        let client_side = get_shared_secret(&client.secret, &mxe.public);
        let mxe_side = get_shared_secret(&mxe.secret, &cipher.public_key());
        assert_eq!(client_side, mxe_side);
    }
}
