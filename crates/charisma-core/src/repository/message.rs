//! MessageRepository trait definition.

use charisma_types::error::RepositoryError;
use charisma_types::session::ChatMessage;
use uuid::Uuid;

/// Repository trait for message persistence within sessions.
pub trait MessageRepository: Send + Sync {
    /// Append a message to its session.
    ///
    /// Returns `NotFound` when the session does not exist.
    fn append(
        &self,
        message: &ChatMessage,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// The most recent messages in a session, newest first, capped at
    /// `limit`. Callers wanting chronological order reverse the result.
    fn recent(
        &self,
        session_id: &Uuid,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<ChatMessage>, RepositoryError>> + Send;
}
