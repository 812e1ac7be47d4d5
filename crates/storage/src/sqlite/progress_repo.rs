use async_trait::async_trait;
use chrono::Utc;
use sqlx::Row;

use crate::repository::{ProgressRepository, StorageError};

use super::SqliteRepository;
use super::mapping::{conn, ser};

#[async_trait]
impl ProgressRepository for SqliteRepository {
    fn key(&self) -> &str {
        &self.key
    }

    async fn load(&self) -> Result<Option<String>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT value
            FROM progress_slots
            WHERE key = ?1
            ",
        )
        .bind(&self.key)
        .fetch_optional(&self.pool)
        .await
        .map_err(conn)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let value: String = row.try_get("value").map_err(ser)?;
        Ok(Some(value))
    }

    async fn save(&self, payload: &str) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress_slots (key, value, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            ",
        )
        .bind(&self.key)
        .bind(payload)
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;

        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        sqlx::query("DELETE FROM progress_slots WHERE key = ?1")
            .bind(&self.key)
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }
}
