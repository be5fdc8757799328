use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One ephemeral key-agreement context.
///
/// ⚠️ `private_key_at_rest` is the custodian's ephemeral scalar SEALED with the
/// at-rest key, bound to `nonce`. It is never stored or logged in the clear.
#[derive(Debug, Clone)]
pub struct Session {
    /// The session id handed to the caller.
    pub id: Uuid,
    /// The subject that created the session.
    pub user_id: String,
    /// Sealed ephemeral private key (nonce || ciphertext || tag).
    pub private_key_at_rest: Vec<u8>,
    /// Random record tag, used as associated data for `private_key_at_rest`.
    pub nonce: Vec<u8>,
    /// The caller's ephemeral public key, SEC1-encoded.
    pub peer_public_key: Vec<u8>,
    /// Set once the session has served its upload or fetch.
    pub consumed_at: Option<DateTime<Utc>>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session already served its single operation.
    pub fn is_consumed(&self) -> bool {
        self.consumed_at.is_some()
    }
}

/// A session row about to be written.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub id: Uuid,
    pub user_id: String,
    pub private_key_at_rest: Vec<u8>,
    pub nonce: Vec<u8>,
    pub peer_public_key: Vec<u8>,
}
