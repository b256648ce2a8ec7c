//! UserRepository trait definition.

use charisma_types::error::RepositoryError;
use charisma_types::user::{PointTransaction, User};
use uuid::Uuid;

/// Repository trait for user accounts and the points ledger.
///
/// Implementations live in charisma-infra (e.g., `SqliteUserRepository`).
pub trait UserRepository: Send + Sync {
    /// Look up a user by the id the chat platform assigned them.
    fn find_by_platform_id(
        &self,
        platform_user_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Get a user by internal id.
    fn get(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Insert a new user.
    ///
    /// Returns `Conflict` when the platform id is already registered.
    fn create(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Point the user at a different character (or clear the selection).
    fn set_current_character(
        &self,
        user_id: &Uuid,
        character_id: Option<&Uuid>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Current points balance for a user.
    fn points_balance(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<i64, RepositoryError>> + Send;

    /// Transfers sent or received by a user, newest first.
    fn points_history(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> impl std::future::Future<Output = Result<Vec<PointTransaction>, RepositoryError>> + Send;
}
