use std::sync::Arc;
use uuid::Uuid;

use crate::{
    crypto::{
        aes::{self, SecureKey},
        ecdh::{self, EphemeralKeyPair},
    },
    error::Result,
    models::session::{NewSession, Session},
    repositories::SessionStore,
};

/// The outcome of a handshake: what the caller needs to derive the transport key.
#[derive(Debug, Clone)]
pub struct CreatedSession {
    pub session_id: Uuid,
    /// The custodian's ephemeral public key, uncompressed SEC1.
    pub server_public_key: Vec<u8>,
}

/// Creates key-agreement sessions.
///
/// Every call produces an independent secp256k1 key pair. The private half is
/// sealed with the at-rest key before it reaches the store.
#[derive(Clone)]
pub struct SessionManager {
    sessions: Arc<dyn SessionStore>,
    at_rest_key: Arc<SecureKey>,
}

impl SessionManager {
    pub fn new(sessions: Arc<dyn SessionStore>, at_rest_key: Arc<SecureKey>) -> Self {
        Self { sessions, at_rest_key }
    }

    /// Opens a session for `user_id` against the caller's ephemeral key.
    ///
    /// A malformed `peer_public_key` fails with `InvalidKey` before anything is
    /// written.
    pub async fn create_session(&self, user_id: &str, peer_public_key: &[u8]) -> Result<CreatedSession> {
        let peer = ecdh::parse_public_key(peer_public_key)?;

        let key_pair = EphemeralKeyPair::generate();
        let nonce = aes::generate_record_nonce();
        let sealed_private_key = aes::seal_bound(&key_pair.secret_bytes(), &self.at_rest_key, &nonce)?;

        let session = self
            .sessions
            .insert(NewSession {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                private_key_at_rest: sealed_private_key,
                nonce,
                // stored normalized so compressed and uncompressed inputs derive alike
                peer_public_key: ecdh::encode_public_key(&peer),
            })
            .await?;

        tracing::info!("✅ Session {} created for user {}", session.id, user_id);

        Ok(CreatedSession {
            session_id: session.id,
            server_public_key: key_pair.public_key_bytes(),
        })
    }
}

/// Recomputes a session's transport key from its stored material.
///
/// Opens the sealed private key with the at-rest key and runs ECDH against the
/// stored peer key. The result is identical for every call on the same session.
pub fn session_transport_key(session: &Session, at_rest_key: &SecureKey) -> Result<SecureKey> {
    let secret = aes::open_bound(&session.private_key_at_rest, at_rest_key, &session.nonce)?;
    let key_pair = EphemeralKeyPair::from_secret_bytes(&secret)?;
    let peer = ecdh::parse_public_key(&session.peer_public_key)?;
    Ok(key_pair.agree(&peer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::repositories::MemorySessionStore;
    use std::collections::HashSet;

    fn manager() -> (SessionManager, Arc<MemorySessionStore>, Arc<SecureKey>) {
        let store = Arc::new(MemorySessionStore::new());
        let key = Arc::new(aes::generate_key());
        (SessionManager::new(store.clone(), key.clone()), store, key)
    }

    #[tokio::test]
    async fn private_key_is_sealed_at_rest() {
        let (manager, store, key) = manager();
        let client = EphemeralKeyPair::generate();

        let created = manager.create_session("alice", &client.public_key_bytes()).await.unwrap();
        let row = store.find_by_id(created.session_id).await.unwrap().unwrap();

        assert_eq!(row.user_id, "alice");
        assert_eq!(row.peer_public_key, client.public_key_bytes());
        assert!(row.private_key_at_rest.len() > 32);

        // the stored key pair matches the public key handed back
        let secret = aes::open_bound(&row.private_key_at_rest, &key, &row.nonce).unwrap();
        let restored = EphemeralKeyPair::from_secret_bytes(&secret).unwrap();
        assert_eq!(restored.public_key_bytes(), created.server_public_key);
    }

    #[tokio::test]
    async fn both_sides_agree_on_the_transport_key() {
        let (manager, store, key) = manager();
        let client = EphemeralKeyPair::generate();

        let created = manager.create_session("alice", &client.public_key_bytes()).await.unwrap();
        let row = store.find_by_id(created.session_id).await.unwrap().unwrap();

        let server_side = session_transport_key(&row, &key).unwrap();
        let client_side = client.agree(&ecdh::parse_public_key(&created.server_public_key).unwrap());
        assert_eq!(server_side.as_bytes(), client_side.as_bytes());
    }

    #[tokio::test]
    async fn session_ids_and_keys_are_never_reused() {
        let (manager, _store, _key) = manager();
        let client = EphemeralKeyPair::generate();

        let mut ids = HashSet::new();
        let mut keys = HashSet::new();
        for _ in 0..64 {
            let created = manager.create_session("alice", &client.public_key_bytes()).await.unwrap();
            assert!(ids.insert(created.session_id));
            assert!(keys.insert(created.server_public_key));
        }
    }

    #[tokio::test]
    async fn malformed_peer_key_writes_nothing() {
        let (manager, store, _key) = manager();

        let err = manager.create_session("alice", b"garbage").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidKey(_)));
        assert!(store.is_empty().await);
    }
}
