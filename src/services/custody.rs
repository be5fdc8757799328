use std::sync::Arc;
use uuid::Uuid;

use crate::{
    crypto::aes::{self, SecureKey},
    error::{AppError, Result},
    models::{
        session::Session,
        share::{share_aad, NewEncryptedShare},
    },
    repositories::{SessionStore, ShareVault},
    services::session::session_transport_key,
};

/// Stores and returns each user's custodied share.
///
/// Shares arrive and leave sealed under a per-session transport key and are
/// stored sealed under the at-rest key. The plaintext share only exists in
/// memory between those two steps.
#[derive(Clone)]
pub struct ShareCustodian {
    sessions: Arc<dyn SessionStore>,
    vault: Arc<dyn ShareVault>,
    at_rest_key: Arc<SecureKey>,
}

impl ShareCustodian {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        vault: Arc<dyn ShareVault>,
        at_rest_key: Arc<SecureKey>,
    ) -> Self {
        Self { sessions, vault, at_rest_key }
    }

    /// Loads a usable session owned by `user_id`.
    ///
    /// Sessions belonging to someone else are reported as not found.
    async fn load_session(&self, user_id: &str, session_id: Uuid) -> Result<Session> {
        let session = self
            .sessions
            .find_by_id(session_id)
            .await?
            .filter(|s| s.user_id == user_id)
            .ok_or_else(|| {
                tracing::warn!("❌ Session {} not found for user {}", session_id, user_id);
                AppError::SessionNotFound
            })?;

        if session.is_consumed() {
            tracing::warn!("❌ Session {} was already used", session_id);
            return Err(AppError::SessionConsumed);
        }

        Ok(session)
    }

    /// Claims the session for this operation. Losing a concurrent race is
    /// reported the same way as reusing a spent session.
    async fn consume(&self, session_id: Uuid) -> Result<()> {
        if !self.sessions.mark_consumed(session_id).await? {
            tracing::warn!("❌ Session {} consumed concurrently", session_id);
            return Err(AppError::SessionConsumed);
        }
        Ok(())
    }

    /// Accepts a share sealed under the session's transport key and takes
    /// custody of it.
    ///
    /// Nothing is written unless the transport ciphertext opens and the user
    /// holds no share yet. A concurrent upload that wins the race turns this
    /// call into `DuplicateShare` through the vault's uniqueness guarantee.
    /// If the vault rejects the insert, the session is released again.
    pub async fn receive_share(
        &self,
        user_id: &str,
        session_id: Uuid,
        transport_ciphertext: &[u8],
    ) -> Result<()> {
        let session = self.load_session(user_id, session_id).await?;

        let transport_key = session_transport_key(&session, &self.at_rest_key)?;
        let share = aes::open(transport_ciphertext, &transport_key)?;

        if self.vault.find_by_user(user_id).await?.is_some() {
            tracing::warn!("❌ User {} already has a share in custody", user_id);
            return Err(AppError::DuplicateShare);
        }

        let nonce = aes::generate_record_nonce();
        let ciphertext = aes::seal_bound(&share, &self.at_rest_key, &share_aad(&nonce, user_id))?;
        drop(share);

        self.consume(session_id).await?;

        let inserted = self
            .vault
            .insert(NewEncryptedShare {
                id: Uuid::new_v4(),
                user_id: user_id.to_string(),
                nonce,
                ciphertext,
            })
            .await;

        let stored = match inserted {
            Ok(stored) => stored,
            Err(e) => {
                // a rejected upload must not spend the session
                if let Err(release_err) = self.sessions.release(session_id).await {
                    tracing::error!(
                        "❌ Failed to release session {} after rejected upload: {}",
                        session_id,
                        release_err
                    );
                }
                return Err(e);
            }
        };

        tracing::info!("✅ Share {} taken into custody for user {}", stored.id, user_id);
        Ok(())
    }

    /// Returns the user's share sealed under the session's transport key.
    ///
    /// The session must be a fresh one created for this fetch.
    pub async fn deliver_share(&self, user_id: &str, session_id: Uuid) -> Result<Vec<u8>> {
        let session = self.load_session(user_id, session_id).await?;

        let record = self.vault.find_by_user(user_id).await?.ok_or_else(|| {
            tracing::warn!("❌ No share in custody for user {}", user_id);
            AppError::NoShare
        })?;

        let share = aes::open_bound(
            &record.ciphertext,
            &self.at_rest_key,
            &share_aad(&record.nonce, &record.user_id),
        )?;

        let transport_key = session_transport_key(&session, &self.at_rest_key)?;
        let transport_ciphertext = aes::seal(&share, &transport_key)?;

        self.consume(session_id).await?;

        tracing::info!("✅ Share delivered to user {} over session {}", user_id, session_id);
        Ok(transport_ciphertext)
    }

    /// Erases custody for `user_id`. Succeeds whether or not a share existed.
    pub async fn reset_custody(&self, user_id: &str) -> Result<()> {
        if self.vault.delete_by_user(user_id).await? {
            tracing::info!("🗑️ Custody erased for user {}", user_id);
        } else {
            tracing::debug!("No custody to erase for user {}", user_id);
        }
        Ok(())
    }

    /// Whether a share is in custody for `user_id`.
    pub async fn custody_status(&self, user_id: &str) -> Result<bool> {
        Ok(self.vault.find_by_user(user_id).await?.is_some())
    }
}
