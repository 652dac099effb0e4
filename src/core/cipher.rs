//! Symmetric cipher abstraction and the AES-256-GCM backend.
//!
//! Secrets are stored as `IV || ciphertext`: a fixed-size random IV prefix
//! followed by the cipher output. The distilled format this replaces used an
//! unauthenticated CFB stream; this implementation deliberately strengthens
//! that to AES-256-GCM, so a flipped bit in a stored file fails decryption
//! instead of producing silently corrupted plaintext. The layout contract is
//! unchanged apart from the IV being a 12-byte GCM nonce.

use std::fmt;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::constant_time;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::trace;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};

/// Size of the symmetric key in bytes (256 bits).
pub const KEY_LEN: usize = 32;

/// Size of the IV prefix in bytes (96-bit GCM nonce).
pub const IV_LEN: usize = 12;

/// Raw symmetric key material.
///
/// Never persisted in plaintext; zeroed on drop. Exists in memory only for
/// the duration of an operation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey(Vec<u8>);

// Comparing key material must not reveal where the bytes first differ.
impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        constant_time::verify_slices_are_equal(&self.0, &other.0).is_ok()
    }
}

impl Eq for SymmetricKey {}

impl SymmetricKey {
    /// Generate a fresh random key of `len` bytes from the system RNG.
    pub fn generate(len: usize) -> Result<Self> {
        let rng = SystemRandom::new();
        let mut bytes = vec![0u8; len];
        rng.fill(&mut bytes)
            .map_err(|_| Error::CryptoProvider("system randomness unavailable".to_string()))?;
        Ok(Self(bytes))
    }

    /// Wrap raw key bytes (e.g. freshly unwrapped from an envelope).
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Key material stays out of logs and panic messages.
        write!(f, "SymmetricKey({} bytes)", self.0.len())
    }
}

/// Symmetric cipher capability.
///
/// Encrypts and decrypts byte buffers given a raw key and a caller-supplied
/// IV. The store owns the `IV || ciphertext` framing; implementations only
/// see the separated parts.
pub trait SymmetricCipher {
    /// Required key length in bytes.
    fn key_len(&self) -> usize;

    /// Required IV length in bytes.
    fn iv_len(&self) -> usize;

    /// Encrypt `plaintext` under `key` with the given IV.
    fn encrypt(&self, key: &SymmetricKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt `ciphertext` under `key` with the given IV.
    fn decrypt(&self, key: &SymmetricKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>>;

    /// Generate a fresh random IV of `iv_len()` bytes.
    fn random_iv(&self) -> Result<Vec<u8>> {
        let rng = SystemRandom::new();
        let mut iv = vec![0u8; self.iv_len()];
        rng.fill(&mut iv)
            .map_err(|_| Error::CryptoProvider("system randomness unavailable".to_string()))?;
        Ok(iv)
    }

    /// Backend name for display/config.
    fn name(&self) -> &'static str;
}

/// AES-256-GCM backend backed by `ring`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Aes256Gcm;

impl Aes256Gcm {
    fn sealing_key(&self, key: &SymmetricKey) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, key.as_bytes()).map_err(|_| {
            Error::CryptoProvider(format!(
                "invalid key length: expected {} bytes, got {}",
                KEY_LEN,
                key.len()
            ))
        })?;
        Ok(LessSafeKey::new(unbound))
    }

    fn nonce(&self, iv: &[u8]) -> Result<Nonce> {
        Nonce::try_assume_unique_for_key(iv).map_err(|_| {
            Error::CryptoProvider(format!(
                "invalid iv length: expected {} bytes, got {}",
                IV_LEN,
                iv.len()
            ))
        })
    }
}

impl SymmetricCipher for Aes256Gcm {
    fn key_len(&self) -> usize {
        KEY_LEN
    }

    fn iv_len(&self) -> usize {
        IV_LEN
    }

    fn name(&self) -> &'static str {
        "aes-256-gcm"
    }

    fn encrypt(&self, key: &SymmetricKey, iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        trace!(plaintext_len = plaintext.len(), "encrypting");

        let sealing = self.sealing_key(key)?;
        let nonce = self.nonce(iv)?;

        let mut buf = plaintext.to_vec();
        sealing
            .seal_in_place_append_tag(nonce, Aad::empty(), &mut buf)
            .map_err(|_| Error::EncryptionFailed("aead seal failed".to_string()))?;

        trace!(ciphertext_len = buf.len(), "encrypted");
        Ok(buf)
    }

    fn decrypt(&self, key: &SymmetricKey, iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        trace!(ciphertext_len = ciphertext.len(), "decrypting");

        let opening = self.sealing_key(key)?;
        let nonce = self.nonce(iv)?;

        let mut buf = ciphertext.to_vec();
        let plaintext = opening
            .open_in_place(nonce, Aad::empty(), &mut buf)
            .map_err(|_| {
                Error::DecryptionFailed("authentication failed: wrong key or tampered data".to_string())
            })?;

        Ok(plaintext.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> SymmetricKey {
        SymmetricKey::generate(KEY_LEN).unwrap()
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let cipher = Aes256Gcm;
        let key = key();
        let iv = cipher.random_iv().unwrap();

        let ciphertext = cipher.encrypt(&key, &iv, b"hello world").unwrap();
        assert_ne!(&ciphertext[..], b"hello world");

        let plaintext = cipher.decrypt(&key, &iv, &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello world");
    }

    #[test]
    fn test_wrong_key_fails() {
        let cipher = Aes256Gcm;
        let iv = cipher.random_iv().unwrap();
        let ciphertext = cipher.encrypt(&key(), &iv, b"payload").unwrap();

        let err = cipher.decrypt(&key(), &iv, &ciphertext).unwrap_err();
        assert!(matches!(err, Error::DecryptionFailed(_)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let cipher = Aes256Gcm;
        let key = key();
        let iv = cipher.random_iv().unwrap();

        let mut ciphertext = cipher.encrypt(&key, &iv, b"payload").unwrap();
        ciphertext[0] ^= 0x01;

        assert!(cipher.decrypt(&key, &iv, &ciphertext).is_err());
    }

    #[test]
    fn test_bad_iv_length_rejected() {
        let cipher = Aes256Gcm;
        let err = cipher.encrypt(&key(), &[0u8; 4], b"payload").unwrap_err();
        assert!(matches!(err, Error::CryptoProvider(_)));
    }

    #[test]
    fn test_bad_key_length_rejected() {
        let cipher = Aes256Gcm;
        let short = SymmetricKey::from_bytes(vec![0u8; 7]);
        let iv = cipher.random_iv().unwrap();
        let err = cipher.encrypt(&short, &iv, b"payload").unwrap_err();
        assert!(matches!(err, Error::CryptoProvider(_)));
    }

    #[test]
    fn test_key_equality_by_value() {
        let a = SymmetricKey::from_bytes(vec![7u8; KEY_LEN]);
        let b = SymmetricKey::from_bytes(vec![7u8; KEY_LEN]);
        let c = SymmetricKey::from_bytes(vec![8u8; KEY_LEN]);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, SymmetricKey::from_bytes(vec![7u8; 16]));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let key = SymmetricKey::from_bytes(vec![0xAB; KEY_LEN]);
        let shown = format!("{:?}", key);
        assert!(!shown.contains("AB"));
        assert!(shown.contains("32 bytes"));
    }
}
