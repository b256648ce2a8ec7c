//! SQLite session repository implementation.
//!
//! `find_or_create_latest` runs inside one writer transaction: the
//! lookup and the insert cannot interleave with another unit of work for
//! the same pair, so a burst of first messages yields exactly one
//! session.

use charisma_core::repository::SessionRepository;
use charisma_types::error::RepositoryError;
use charisma_types::session::ChatSession;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::tx::with_write_tx;
use super::{format_datetime, map_sqlx_err, parse_datetime};

/// SQLite-backed implementation of `SessionRepository`.
#[derive(Clone)]
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatSessionRow {
    id: String,
    user_id: String,
    character_id: String,
    started_at: String,
}

impl ChatSessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            character_id: row.try_get("character_id")?,
            started_at: row.try_get("started_at")?,
        })
    }

    fn into_session(self) -> Result<ChatSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let user_id = Uuid::parse_str(&self.user_id)
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;
        let character_id = Uuid::parse_str(&self.character_id)
            .map_err(|e| RepositoryError::Query(format!("invalid character_id: {e}")))?;
        let started_at = parse_datetime(&self.started_at)?;

        Ok(ChatSession {
            id,
            user_id,
            character_id,
            started_at,
        })
    }
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn get(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM chat_sessions WHERE id = ?")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let session_row = ChatSessionRow::from_row(&row).map_err(map_sqlx_err)?;
                Ok(Some(session_row.into_session()?))
            }
            None => Ok(None),
        }
    }

    async fn find_or_create_latest(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> Result<ChatSession, RepositoryError> {
        let user_id = *user_id;
        let character_id = *character_id;

        with_write_tx(&self.pool, move |conn| {
            Box::pin(async move {
                let row = sqlx::query(
                    r#"SELECT * FROM chat_sessions
                       WHERE user_id = ? AND character_id = ?
                       ORDER BY started_at DESC, id DESC
                       LIMIT 1"#,
                )
                .bind(user_id.to_string())
                .bind(character_id.to_string())
                .fetch_optional(&mut *conn)
                .await
                .map_err(map_sqlx_err)?;

                if let Some(row) = row {
                    let session_row = ChatSessionRow::from_row(&row).map_err(map_sqlx_err)?;
                    return session_row.into_session();
                }

                let session = ChatSession::open(user_id, character_id);
                sqlx::query(
                    r#"INSERT INTO chat_sessions (id, user_id, character_id, started_at)
                       VALUES (?, ?, ?, ?)"#,
                )
                .bind(session.id.to_string())
                .bind(session.user_id.to_string())
                .bind(session.character_id.to_string())
                .bind(format_datetime(&session.started_at))
                .execute(&mut *conn)
                .await
                .map_err(map_sqlx_err)?;

                Ok(session)
            })
        })
        .await
    }
}
