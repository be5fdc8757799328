use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::{
    error::{AppError, Result},
    models::share::{EncryptedShare, NewEncryptedShare},
    repositories::ShareVault,
};

/// A helper function to map a `tokio_postgres::Row` to an `EncryptedShare`.
fn row_to_share(row: &Row) -> Result<EncryptedShare> {
    let column = |name: &str| AppError::Persistence(format!("share row missing column {}", name));
    Ok(EncryptedShare {
        id: row.try_get("id").map_err(|_| column("id"))?,
        user_id: row.try_get("user_id").map_err(|_| column("user_id"))?,
        nonce: row.try_get("nonce").map_err(|_| column("nonce"))?,
        ciphertext: row.try_get("encrypted_data").map_err(|_| column("encrypted_data"))?,
        created_at: row.try_get("created_at").map_err(|_| column("created_at"))?,
        updated_at: row.try_get("updated_at").map_err(|_| column("updated_at"))?,
    })
}

/// Share vault backed by the `encrypted_shares` table.
///
/// One-share-per-user is enforced by the `UNIQUE (user_id)` constraint.
#[derive(Clone)]
pub struct PgShareVault {
    pool: Pool,
}

impl PgShareVault {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ShareVault for PgShareVault {
    async fn find_by_user(&self, user_id: &str) -> Result<Option<EncryptedShare>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT *
                FROM encrypted_shares
                WHERE user_id = $1
                "#,
                &[&user_id],
            )
            .await?;
        row.map(|r| row_to_share(&r)).transpose()
    }

    async fn insert(&self, share: NewEncryptedShare) -> Result<EncryptedShare> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                INSERT INTO encrypted_shares (id, user_id, nonce, encrypted_data)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT (user_id) DO NOTHING
                RETURNING *
                "#,
                &[&share.id, &share.user_id, &share.nonce, &share.ciphertext],
            )
            .await?;

        match row {
            Some(r) => row_to_share(&r),
            None => Err(AppError::DuplicateShare),
        }
    }

    async fn delete_by_user(&self, user_id: &str) -> Result<bool> {
        let client = self.pool.get().await?;
        let deleted = client
            .execute(
                r#"
                DELETE FROM encrypted_shares
                WHERE user_id = $1
                "#,
                &[&user_id],
            )
            .await?;
        Ok(deleted > 0)
    }
}
