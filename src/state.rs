use std::sync::Arc;
use crate::config::{Config, StorageBackend};
use crate::crypto::aes::SecureKey;
use crate::error::Result;
use crate::repositories::{
    MemorySessionStore, MemoryShareVault, PgSessionStore, PgShareVault, SessionStore, ShareVault,
};
use crate::services::{
    custody::ShareCustodian,
    identity::{IdentityVerifier, JwtVerifier},
    session::SessionManager,
};

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// Opens key-agreement sessions.
    pub sessions: SessionManager,
    /// Uploads, fetches and erases custodied shares.
    pub custodian: ShareCustodian,
    /// Turns bearer tokens into subjects.
    pub verifier: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Creates a new `AppState` from the configuration, connecting to the
    /// configured store.
    pub async fn new(config: &Config) -> Result<Self> {
        let at_rest_key = Arc::new(SecureKey::from_slice(&config.at_rest_key)?);

        let (sessions, vault): (Arc<dyn SessionStore>, Arc<dyn ShareVault>) = match config.storage {
            StorageBackend::Postgres => {
                let url = config.database_url.as_deref().unwrap_or_default();
                let pool = crate::db::create_pool(url)?;
                crate::db::apply_schema(&pool).await?;
                tracing::info!("✅ PostgreSQL pool initialized");
                (
                    Arc::new(PgSessionStore::new(pool.clone())) as Arc<dyn SessionStore>,
                    Arc::new(PgShareVault::new(pool)) as Arc<dyn ShareVault>,
                )
            }
            StorageBackend::Memory => {
                tracing::warn!("⚠️  Using in-memory stores, custody is lost on restart");
                (
                    Arc::new(MemorySessionStore::new()) as Arc<dyn SessionStore>,
                    Arc::new(MemoryShareVault::new()) as Arc<dyn ShareVault>,
                )
            }
        };

        let verifier = Arc::new(JwtVerifier::from_config(&config.auth)?);
        tracing::info!("✅ Token verifier initialized for issuer {}", config.auth.issuer);

        Ok(Self::from_parts(sessions, vault, at_rest_key, verifier))
    }

    /// Assembles the state from already-built collaborators.
    pub fn from_parts(
        sessions: Arc<dyn SessionStore>,
        vault: Arc<dyn ShareVault>,
        at_rest_key: Arc<SecureKey>,
        verifier: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            sessions: SessionManager::new(sessions.clone(), at_rest_key.clone()),
            custodian: ShareCustodian::new(sessions, vault, at_rest_key),
            verifier,
        }
    }
}
