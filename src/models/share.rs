use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The custodian's record for one user's third share.
///
/// At most one exists per `user_id`.
#[derive(Debug, Clone)]
pub struct EncryptedShare {
    pub id: Uuid,
    pub user_id: String,
    /// Random record tag, bound into `ciphertext` as associated data.
    pub nonce: Vec<u8>,
    /// Share bytes sealed with the at-rest key.
    pub ciphertext: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A share row about to be written.
#[derive(Debug, Clone)]
pub struct NewEncryptedShare {
    pub id: Uuid,
    pub user_id: String,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// Associated data for a sealed share: the record tag followed by the owner.
pub fn share_aad(nonce: &[u8], user_id: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(nonce.len() + user_id.len());
    aad.extend_from_slice(nonce);
    aad.extend_from_slice(user_id.as_bytes());
    aad
}
