use std::fmt;

use k256::{elliptic_curve::sec1::ToEncodedPoint, PublicKey, SecretKey};
use sha3::{Digest, Keccak256};
use zeroize::Zeroizing;

use crate::error::{AppError, Result};

/// A secp256k1 signing key rebuilt from shares, with its EVM address.
pub struct Wallet {
    secret: SecretKey,
    address: String,
}

impl Wallet {
    /// Rebuilds the wallet from a 32-byte private scalar.
    pub fn from_secret(bytes: &[u8]) -> Result<Self> {
        let secret = SecretKey::from_slice(bytes)
            .map_err(|e| AppError::InvalidKey(format!("recovered secret is not a signing key: {}", e)))?;
        let address = evm_address(&secret.public_key());
        Ok(Self { secret, address })
    }

    pub fn secret_bytes(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.secret.to_bytes().to_vec())
    }

    /// Uncompressed SEC1 public key.
    pub fn public_key_bytes(&self) -> Vec<u8> {
        self.secret.public_key().to_encoded_point(false).as_bytes().to_vec()
    }

    /// EIP-55 checksummed address, `0x`-prefixed.
    pub fn address(&self) -> &str {
        &self.address
    }
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet").field("address", &self.address).finish_non_exhaustive()
    }
}

/// The last 20 bytes of Keccak-256 over the uncompressed point, without its
/// `0x04` prefix.
pub fn evm_address(public: &PublicKey) -> String {
    let point = public.to_encoded_point(false);
    let digest = Keccak256::digest(&point.as_bytes()[1..]);
    to_checksum_address(&hex::encode(&digest[12..]))
}

/// Applies EIP-55 mixed-case checksumming to a lowercase hex address.
fn to_checksum_address(lower: &str) -> String {
    let hash = Keccak256::digest(lower.as_bytes());

    let mut address = String::with_capacity(2 + lower.len());
    address.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let nibble = if i % 2 == 0 { hash[i / 2] >> 4 } else { hash[i / 2] & 0x0f };
        if c.is_ascii_alphabetic() && nibble >= 8 {
            address.push(c.to_ascii_uppercase());
        } else {
            address.push(c);
        }
    }
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn address_of_private_key_one() {
        let mut secret = [0u8; 32];
        secret[31] = 1;
        let wallet = Wallet::from_secret(&secret).unwrap();
        assert_eq!(wallet.address(), "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf");
        assert_eq!(wallet.public_key_bytes().len(), 65);
        assert_eq!(wallet.secret_bytes().as_slice(), &secret);
    }

    #[test]
    fn checksum_casing() {
        assert_eq!(
            to_checksum_address("5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );
        assert_eq!(
            to_checksum_address("fb6916095ca1df60bb79ce92ce3ea74c37c5d359"),
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359"
        );
    }

    #[test]
    fn invalid_scalars_are_rejected() {
        assert!(matches!(Wallet::from_secret(&[0u8; 32]), Err(AppError::InvalidKey(_))));
        assert!(matches!(Wallet::from_secret(&[1u8; 31]), Err(AppError::InvalidKey(_))));
        let debug = format!("{:?}", Wallet::from_secret(&[7u8; 32]).unwrap());
        assert!(debug.starts_with("Wallet { address: \"0x"));
    }
}
