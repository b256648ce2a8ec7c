//! SQLite relation repository implementation.
//!
//! Memory and affinity each hold one row per (user, character) pair.
//! Writes are single-statement `INSERT ... ON CONFLICT DO UPDATE`
//! upserts on the writer pool, so two concurrent turns for the same pair
//! cannot race an update-then-insert window into duplicate rows.

use charisma_core::repository::RelationRepository;
use charisma_types::error::RepositoryError;
use charisma_types::relation::{Affinity, Memory};
use chrono::Utc;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_err, parse_datetime};

/// SQLite-backed implementation of `RelationRepository`.
#[derive(Clone)]
pub struct SqliteRelationRepository {
    pool: DatabasePool,
}

impl SqliteRelationRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// RelationRepository implementation
// ---------------------------------------------------------------------------

impl RelationRepository for SqliteRelationRepository {
    async fn memory(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> Result<Option<Memory>, RepositoryError> {
        let row = sqlx::query(
            "SELECT summary, updated_at FROM memories WHERE user_id = ? AND character_id = ?",
        )
        .bind(user_id.to_string())
        .bind(character_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let summary: String = row.try_get("summary").map_err(map_sqlx_err)?;
                let updated_at: String = row.try_get("updated_at").map_err(map_sqlx_err)?;
                Ok(Some(Memory {
                    user_id: *user_id,
                    character_id: *character_id,
                    summary,
                    updated_at: parse_datetime(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    async fn affinity(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> Result<Option<Affinity>, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as(
            "SELECT value FROM affinities WHERE user_id = ? AND character_id = ?",
        )
        .bind(user_id.to_string())
        .bind(character_id.to_string())
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        Ok(row.map(|(value,)| Affinity::clamped(value)))
    }

    async fn upsert_memory(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
        summary: &str,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        sqlx::query(
            r#"INSERT INTO memories (user_id, character_id, summary, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (user_id, character_id) DO UPDATE SET summary = excluded.summary, updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(character_id.to_string())
        .bind(summary)
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn upsert_affinity(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
        value: Affinity,
    ) -> Result<(), RepositoryError> {
        let now = format_datetime(&Utc::now());
        sqlx::query(
            r#"INSERT INTO affinities (user_id, character_id, value, updated_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (user_id, character_id) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at"#,
        )
        .bind(user_id.to_string())
        .bind(character_id.to_string())
        .bind(value.value())
        .bind(&now)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }
}
