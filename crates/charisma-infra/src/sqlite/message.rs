//! SQLite message repository implementation.

use charisma_core::repository::MessageRepository;
use charisma_types::error::RepositoryError;
use charisma_types::session::ChatMessage;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_err, parse_datetime};

/// SQLite-backed implementation of `MessageRepository`.
#[derive(Clone)]
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct ChatMessageRow {
    id: String,
    session_id: String,
    author_id: Option<String>,
    content: String,
    created_at: String,
}

impl ChatMessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            session_id: row.try_get("session_id")?,
            author_id: row.try_get("author_id")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let session_id = Uuid::parse_str(&self.session_id)
            .map_err(|e| RepositoryError::Query(format!("invalid session_id: {e}")))?;
        let author_id = self
            .author_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid author_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ChatMessage {
            id,
            session_id,
            author_id,
            content: self.content,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// MessageRepository implementation
// ---------------------------------------------------------------------------

impl MessageRepository for SqliteMessageRepository {
    async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO messages (id, session_id, author_id, content, created_at)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.session_id.to_string())
        .bind(message.author_id.map(|id| id.to_string()))
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            // A missing session surfaces as a foreign key violation.
            Err(e) if e.as_database_error().is_some_and(|d| d.is_foreign_key_violation()) => {
                Err(RepositoryError::NotFound)
            }
            Err(e) => Err(map_sqlx_err(e)),
        }
    }

    async fn recent(
        &self,
        session_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<ChatMessage>, RepositoryError> {
        // Id is a UUIDv7, so it breaks ties between messages written
        // within the same timestamp.
        let rows = sqlx::query(
            r#"SELECT * FROM messages
               WHERE session_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row = ChatMessageRow::from_row(row).map_err(map_sqlx_err)?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }
}
