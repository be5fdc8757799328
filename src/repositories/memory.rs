//! In-memory stores.
//!
//! Used by the test suites and by `STORAGE_BACKEND=memory` deployments. Data
//! is lost on restart.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::session::{NewSession, Session};
use crate::models::share::{EncryptedShare, NewEncryptedShare};
use crate::repositories::{SessionStore, ShareVault};

/// In-memory session store.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of session rows held.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: NewSession) -> Result<Session> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.id) {
            return Err(AppError::Persistence(format!("session {} already exists", session.id)));
        }

        let now = Utc::now();
        let row = Session {
            id: session.id,
            user_id: session.user_id,
            private_key_at_rest: session.private_key_at_rest,
            nonce: session.nonce,
            peer_public_key: session.peer_public_key,
            consumed_at: None,
            created_at: now,
            updated_at: now,
        };
        sessions.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        Ok(self.sessions.read().await.get(&id).cloned())
    }

    async fn mark_consumed(&self, id: Uuid) -> Result<bool> {
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id) {
            Some(session) if session.consumed_at.is_none() => {
                let now = Utc::now();
                session.consumed_at = Some(now);
                session.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn release(&self, id: Uuid) -> Result<()> {
        if let Some(session) = self.sessions.write().await.get_mut(&id) {
            session.consumed_at = None;
            session.updated_at = Utc::now();
        }
        Ok(())
    }
}

/// In-memory share vault, keyed by user id.
#[derive(Default)]
pub struct MemoryShareVault {
    shares: RwLock<HashMap<String, EncryptedShare>>,
}

impl MemoryShareVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of shares in custody.
    pub async fn len(&self) -> usize {
        self.shares.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.shares.read().await.is_empty()
    }
}

#[async_trait]
impl ShareVault for MemoryShareVault {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<EncryptedShare>> {
        Ok(self.shares.read().await.get(user_id).cloned())
    }

    async fn insert(&self, share: NewEncryptedShare) -> Result<EncryptedShare> {
        // check and insert under one write guard, like a unique index
        let mut shares = self.shares.write().await;
        if shares.contains_key(&share.user_id) {
            return Err(AppError::DuplicateShare);
        }

        let now = Utc::now();
        let row = EncryptedShare {
            id: share.id,
            user_id: share.user_id,
            nonce: share.nonce,
            ciphertext: share.ciphertext,
            created_at: now,
            updated_at: now,
        };
        shares.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }

    async fn delete_by_user(&self, user_id: &str) -> Result<bool> {
        Ok(self.shares.write().await.remove(user_id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_share(user_id: &str, ciphertext: &[u8]) -> NewEncryptedShare {
        NewEncryptedShare {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            nonce: vec![1; 16],
            ciphertext: ciphertext.to_vec(),
        }
    }

    fn new_session(user_id: &str) -> NewSession {
        NewSession {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            private_key_at_rest: vec![9; 60],
            nonce: vec![2; 16],
            peer_public_key: vec![4; 65],
        }
    }

    #[tokio::test]
    async fn vault_keeps_one_share_per_user() {
        let vault = MemoryShareVault::new();
        vault.insert(new_share("alice", b"first")).await.unwrap();

        let second = vault.insert(new_share("alice", b"second")).await;
        assert!(matches!(second, Err(AppError::DuplicateShare)));

        let held = vault.find_by_user("alice").await.unwrap().unwrap();
        assert_eq!(held.ciphertext, b"first");
        assert_eq!(vault.len().await, 1);

        vault.insert(new_share("bob", b"bob's")).await.unwrap();
        assert_eq!(vault.len().await, 2);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let vault = MemoryShareVault::new();
        vault.insert(new_share("alice", b"x")).await.unwrap();
        assert!(vault.delete_by_user("alice").await.unwrap());
        assert!(!vault.delete_by_user("alice").await.unwrap());
        assert!(vault.is_empty().await);
    }

    #[tokio::test]
    async fn session_is_consumed_once() {
        let store = MemorySessionStore::new();
        let session = store.insert(new_session("alice")).await.unwrap();
        assert!(!session.is_consumed());

        assert!(store.mark_consumed(session.id).await.unwrap());
        assert!(!store.mark_consumed(session.id).await.unwrap());
        assert!(!store.mark_consumed(Uuid::new_v4()).await.unwrap());

        let reloaded = store.find_by_id(session.id).await.unwrap().unwrap();
        assert!(reloaded.is_consumed());
        assert_eq!(reloaded.private_key_at_rest, session.private_key_at_rest);
    }

    #[tokio::test]
    async fn released_session_can_be_claimed_again() {
        let store = MemorySessionStore::new();
        let session = store.insert(new_session("alice")).await.unwrap();

        assert!(store.mark_consumed(session.id).await.unwrap());
        store.release(session.id).await.unwrap();
        assert!(!store.find_by_id(session.id).await.unwrap().unwrap().is_consumed());
        assert!(store.mark_consumed(session.id).await.unwrap());

        store.release(Uuid::new_v4()).await.unwrap();
        assert_eq!(store.len().await, 1);
    }
}
