//! Record stores for sessions and custodied shares.
//!
//! Both stores are traits so the services can run against Postgres in
//! production and against the in-memory stores in tests.

pub mod memory;
pub mod session;
pub mod share;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::session::{NewSession, Session};
use crate::models::share::{EncryptedShare, NewEncryptedShare};

pub use memory::{MemorySessionStore, MemoryShareVault};
pub use session::PgSessionStore;
pub use share::PgShareVault;

/// Persists ephemeral key-agreement sessions, keyed by session id.
///
/// Implementations must be safe for concurrent use.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Writes a new session row.
    async fn insert(&self, session: NewSession) -> Result<Session>;

    /// Reads a session by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>>;

    /// Marks a session as used.
    ///
    /// Returns `false` if it was already consumed or does not exist. Only one
    /// of several concurrent callers can observe `true`.
    async fn mark_consumed(&self, id: Uuid) -> Result<bool>;

    /// Clears the mark set by [`SessionStore::mark_consumed`], for an
    /// operation that failed after claiming the session.
    async fn release(&self, id: Uuid) -> Result<()>;
}

/// Persists at most one encrypted share per user.
#[async_trait]
pub trait ShareVault: Send + Sync {
    /// Reads the share held for `user_id`.
    async fn find_by_user(&self, user_id: &str) -> Result<Option<EncryptedShare>>;

    /// Writes a share.
    ///
    /// Fails with [`AppError::DuplicateShare`](crate::error::AppError::DuplicateShare)
    /// if a share for the same user already exists, atomically with the write.
    async fn insert(&self, share: NewEncryptedShare) -> Result<EncryptedShare>;

    /// Deletes the share held for `user_id`. Returns whether a row was removed.
    async fn delete_by_user(&self, user_id: &str) -> Result<bool>;
}
