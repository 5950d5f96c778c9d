//! `PostgreSQL` store backed by the `users.ai_api_key` column.

use super::{CredentialStore, StoreError};
use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::Instrument;

#[derive(Debug, Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn db_span(operation: &'static str) -> tracing::Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation
    )
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        let query = "SELECT ai_api_key FROM users WHERE id = $1";
        let row = sqlx::query(query)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .instrument(db_span("SELECT"))
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        Ok(row.try_get::<Option<String>, _>("ai_api_key")?)
    }

    async fn put(&self, user_id: &str, encrypted: &str) -> Result<(), StoreError> {
        let query = r"
            INSERT INTO users (id, ai_api_key)
            VALUES ($1, $2)
            ON CONFLICT (id) DO UPDATE
            SET ai_api_key = EXCLUDED.ai_api_key, updated_at = NOW()
        ";
        sqlx::query(query)
            .bind(user_id)
            .bind(encrypted)
            .execute(&self.pool)
            .instrument(db_span("INSERT"))
            .await?;

        Ok(())
    }

    async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let query = r"
            UPDATE users
            SET ai_api_key = NULL, updated_at = NOW()
            WHERE id = $1 AND ai_api_key IS NOT NULL
        ";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(db_span("UPDATE"))
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
