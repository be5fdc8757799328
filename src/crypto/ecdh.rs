use k256::{
    ecdh::diffie_hellman,
    elliptic_curve::sec1::ToEncodedPoint,
    PublicKey, SecretKey,
};
use rand::rngs::OsRng;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::crypto::aes::{SecureKey, KEY_SIZE};
use crate::error::{AppError, Result};

/// Length of an uncompressed SEC1 secp256k1 point.
pub const PUBLIC_KEY_SIZE: usize = 65;

/// An ephemeral secp256k1 key pair, used for exactly one protocol run.
pub struct EphemeralKeyPair {
    secret: SecretKey,
    public: PublicKey,
}

impl EphemeralKeyPair {
    /// Generates a fresh key pair from the OS RNG.
    pub fn generate() -> Self {
        let secret = SecretKey::random(&mut OsRng);
        let public = secret.public_key();
        Self { secret, public }
    }

    /// Rebuilds a key pair from a stored 32-byte scalar.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| AppError::InvalidKey(format!("invalid private key: {}", e)))?;
        let public = secret.public_key();
        Ok(Self { secret, public })
    }

    /// The private scalar, big-endian.
    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    /// The public key as an uncompressed SEC1 point (65 bytes, `0x04` prefix).
    pub fn public_key_bytes(&self) -> Vec<u8> {
        encode_public_key(&self.public)
    }

    /// Derives the 32-byte transport key shared with `peer`.
    ///
    /// Returns SHA256 of the raw ECDH x-coordinate.
    pub fn agree(&self, peer: &PublicKey) -> SecureKey {
        let shared = diffie_hellman(self.secret.to_nonzero_scalar(), peer.as_affine());
        let digest = Sha256::digest(shared.raw_secret_bytes());

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        SecureKey::new(key)
    }
}

/// Parses a SEC1-encoded secp256k1 public key (compressed or uncompressed).
pub fn parse_public_key(bytes: &[u8]) -> Result<PublicKey> {
    PublicKey::from_sec1_bytes(bytes)
        .map_err(|_| AppError::InvalidKey(format!("not a valid secp256k1 point ({} bytes)", bytes.len())))
}

/// Encodes a public key as an uncompressed SEC1 point.
pub fn encode_public_key(key: &PublicKey) -> Vec<u8> {
    key.to_encoded_point(false).as_bytes().to_vec()
}
