use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::session::{NewSession, Session},
    repositories::SessionStore,
};

/// A helper function to map a `tokio_postgres::Row` to a `Session`.
fn row_to_session(row: &Row) -> Result<Session> {
    let column = |name: &str| AppError::Persistence(format!("session row missing column {}", name));
    Ok(Session {
        id: row.try_get("id").map_err(|_| column("id"))?,
        user_id: row.try_get("user_id").map_err(|_| column("user_id"))?,
        private_key_at_rest: row.try_get("private_key").map_err(|_| column("private_key"))?,
        nonce: row.try_get("nonce").map_err(|_| column("nonce"))?,
        peer_public_key: row.try_get("dest_public_key").map_err(|_| column("dest_public_key"))?,
        consumed_at: row.try_get("consumed_at").map_err(|_| column("consumed_at"))?,
        created_at: row.try_get("created_at").map_err(|_| column("created_at"))?,
        updated_at: row.try_get("updated_at").map_err(|_| column("updated_at"))?,
    })
}

/// Session store backed by the `session` table.
#[derive(Clone)]
pub struct PgSessionStore {
    pool: Pool,
}

impl PgSessionStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, session: NewSession) -> Result<Session> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                r#"
                INSERT INTO session (id, user_id, private_key, nonce, dest_public_key)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
                &[
                    &session.id,
                    &session.user_id,
                    &session.private_key_at_rest,
                    &session.nonce,
                    &session.peer_public_key,
                ],
            )
            .await?;
        row_to_session(&row)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Session>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM session
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        row.map(|r| row_to_session(&r)).transpose()
    }

    async fn mark_consumed(&self, id: Uuid) -> Result<bool> {
        let client = self.pool.get().await?;
        let updated = client
            .execute(
                r#"
                UPDATE session
                SET consumed_at = NOW(), updated_at = NOW()
                WHERE id = $1 AND consumed_at IS NULL
                "#,
                &[&id],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn release(&self, id: Uuid) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                UPDATE session
                SET consumed_at = NULL, updated_at = NOW()
                WHERE id = $1
                "#,
                &[&id],
            )
            .await?;
        Ok(())
    }
}
