use aes_gcm::{
    aead::{Aead, KeyInit, OsRng, Payload},
    Aes256Gcm, Nonce,
};
use aes_gcm::aead::rand_core::RngCore;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};
use crate::error::{AppError, Result};

/// The size of the AES-256 key in bytes.
pub const KEY_SIZE: usize = 32;
/// The size of the AES-GCM nonce in bytes.
pub const NONCE_SIZE: usize = 12;
/// The size of the AES-GCM authentication tag in bytes.
pub const TAG_SIZE: usize = 16;
/// The size of the random tag stored next to each record.
pub const RECORD_NONCE_SIZE: usize = 16;

/// A secure key wrapper that ensures the key is zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecureKey([u8; KEY_SIZE]);

impl SecureKey {
    /// Creates a new `SecureKey` from a byte array.
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self(key)
    }

    /// Creates a `SecureKey` from a slice, failing unless it is exactly 32 bytes.
    pub fn from_slice(key: &[u8]) -> Result<Self> {
        let key: [u8; KEY_SIZE] = key
            .try_into()
            .map_err(|_| AppError::Cipher(format!("Key must be {} bytes, got {}", KEY_SIZE, key.len())))?;
        Ok(Self(key))
    }

    /// Returns a reference to the key as a byte slice.
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl fmt::Debug for SecureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecureKey(..)")
    }
}

/// Generates a new random AES-256 key.
pub fn generate_key() -> SecureKey {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    SecureKey::new(key)
}

/// Generates a new random AES-GCM nonce.
pub fn generate_nonce() -> [u8; NONCE_SIZE] {
    let mut nonce = [0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Generates the random tag stored alongside session and share rows.
///
/// The tag is bound into the at-rest ciphertext as associated data, so a
/// sealed blob only opens against the row it was written for.
pub fn generate_record_nonce() -> Vec<u8> {
    let mut nonce = vec![0u8; RECORD_NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce);
    nonce
}

/// Seals `plaintext` under `key` with AES-256-GCM.
///
/// The output is self-describing: `nonce (12) || ciphertext || tag (16)`.
pub fn seal(plaintext: &[u8], key: &SecureKey) -> Result<Vec<u8>> {
    seal_bound(plaintext, key, &[])
}

/// Seals `plaintext` under `key`, authenticating `aad` alongside it.
pub fn seal_bound(plaintext: &[u8], key: &SecureKey, aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let nonce_bytes = generate_nonce();
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, Payload { msg: plaintext, aad })
        .map_err(|e| AppError::Cipher(format!("Encryption failed: {}", e)))?;

    let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

/// Opens a ciphertext produced by [`seal`].
///
/// Fails with [`AppError::Cipher`] when the input is too short to hold a
/// nonce and tag, or when authentication fails (wrong key or tampering).
pub fn open(sealed: &[u8], key: &SecureKey) -> Result<Zeroizing<Vec<u8>>> {
    open_bound(sealed, key, &[])
}

/// Opens a ciphertext produced by [`seal_bound`] with the same `aad`.
pub fn open_bound(sealed: &[u8], key: &SecureKey, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if sealed.len() < NONCE_SIZE + TAG_SIZE {
        return Err(AppError::Cipher(format!(
            "Ciphertext too short: {} bytes",
            sealed.len()
        )));
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_SIZE);
    let cipher = Aes256Gcm::new(key.as_bytes().into());
    let nonce = Nonce::from_slice(nonce_bytes);

    cipher
        .decrypt(nonce, Payload { msg: ciphertext, aad })
        .map(Zeroizing::new)
        .map_err(|e| AppError::Cipher(format!("Decryption failed: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open_returns_plaintext() {
        let key = generate_key();
        let messages: [&[u8]; 4] = [b"", b"x", b"a share of some length", &[7u8; 4096]];
        for message in messages {
            let sealed = seal(message, &key).unwrap();
            assert_eq!(open(&sealed, &key).unwrap().as_slice(), message);
        }
    }

    #[test]
    fn every_seal_uses_a_fresh_nonce() {
        let key = generate_key();
        let a = seal(b"same", &key).unwrap();
        let b = seal(b"same", &key).unwrap();
        assert_ne!(a[..NONCE_SIZE], b[..NONCE_SIZE]);
        assert_ne!(a, b);
    }

    #[test]
    fn flipped_bit_is_rejected() {
        let key = generate_key();
        let mut sealed = seal(b"share bytes", &key).unwrap();
        let last = sealed.len() - 1;
        sealed[NONCE_SIZE + 2] ^= 0x01;
        assert!(matches!(open(&sealed, &key), Err(AppError::Cipher(_))));

        let mut sealed = seal(b"share bytes", &key).unwrap();
        sealed[last] ^= 0x80;
        assert!(matches!(open(&sealed, &key), Err(AppError::Cipher(_))));
    }

    #[test]
    fn wrong_key_is_rejected() {
        let sealed = seal(b"share bytes", &generate_key()).unwrap();
        assert!(matches!(open(&sealed, &generate_key()), Err(AppError::Cipher(_))));
    }

    #[test]
    fn truncated_input_is_malformed() {
        let key = generate_key();
        assert!(matches!(open(&[0u8; NONCE_SIZE + TAG_SIZE - 1], &key), Err(AppError::Cipher(_))));
        assert!(matches!(open(&[], &key), Err(AppError::Cipher(_))));
    }

    #[test]
    fn associated_data_must_match() {
        let key = generate_key();
        let sealed = seal_bound(b"private key", &key, b"row-a").unwrap();
        assert_eq!(open_bound(&sealed, &key, b"row-a").unwrap().as_slice(), b"private key");
        assert!(open_bound(&sealed, &key, b"row-b").is_err());
        assert!(open(&sealed, &key).is_err());
    }

    #[test]
    fn key_length_is_checked() {
        assert!(SecureKey::from_slice(&[0u8; 31]).is_err());
        assert!(SecureKey::from_slice(&[0u8; 32]).is_ok());
        assert_eq!(format!("{:?}", generate_key()), "SecureKey(..)");
    }
}
