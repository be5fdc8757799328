use uuid::Uuid;
use crate::error::{AppError, Result};

/// The largest transport ciphertext accepted, hex-encoded.
const MAX_CIPHERTEXT_HEX_LEN: usize = 16 * 1024;
/// An uncompressed SEC1 point is 65 bytes, 130 hex characters.
const MAX_PUBLIC_KEY_HEX_LEN: usize = 130;

/// Decodes a hex-encoded ephemeral public key.
///
/// Encoding problems are reported as `InvalidKey`; whether the bytes are a
/// point on the curve is checked by the session manager.
pub fn decode_public_key(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidKey("public key is empty".to_string()));
    }

    if value.len() > MAX_PUBLIC_KEY_HEX_LEN {
        return Err(AppError::InvalidKey(format!(
            "public key is {} hex characters, at most {} allowed",
            value.len(),
            MAX_PUBLIC_KEY_HEX_LEN
        )));
    }

    hex::decode(value).map_err(|e| AppError::InvalidKey(format!("public key is not hex: {}", e)))
}

/// Decodes a hex-encoded transport ciphertext.
pub fn decode_ciphertext(value: &str) -> Result<Vec<u8>> {
    let value = value.trim();
    if value.len() > MAX_CIPHERTEXT_HEX_LEN {
        return Err(AppError::Validation(format!(
            "Encrypted share must be at most {} hex characters",
            MAX_CIPHERTEXT_HEX_LEN
        )));
    }

    hex::decode(value).map_err(|e| AppError::Cipher(format!("ciphertext is not hex: {}", e)))
}

/// Parses a session id. Anything that is not a UUID cannot name a session.
pub fn parse_session_id(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value.trim()).map_err(|_| AppError::SessionNotFound)
}
