//! SessionRepository trait definition.

use charisma_types::error::RepositoryError;
use charisma_types::session::ChatSession;
use uuid::Uuid;

/// Repository trait for chat session persistence.
pub trait SessionRepository: Send + Sync {
    /// Get a session by id.
    fn get(
        &self,
        session_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<ChatSession>, RepositoryError>> + Send;

    /// Return the latest session for a (user, character) pair, opening a
    /// new one if none exists yet.
    ///
    /// The lookup and the insert run as one atomic unit, so concurrent
    /// calls for the same pair resolve to a single session.
    fn find_or_create_latest(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<ChatSession, RepositoryError>> + Send;
}
