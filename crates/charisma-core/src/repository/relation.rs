//! RelationRepository trait definition.

use charisma_types::error::RepositoryError;
use charisma_types::relation::{Affinity, Memory};
use uuid::Uuid;

/// Repository trait for per-pair relationship state: the rolling memory
/// summary and the affinity score.
///
/// Both tables hold at most one row per (user, character) pair; writes
/// are single-statement upserts so concurrent turns never race an
/// update-then-insert window.
pub trait RelationRepository: Send + Sync {
    /// The memory summary for a pair, if one has been recorded.
    fn memory(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Memory>, RepositoryError>> + Send;

    /// The affinity score for a pair, if one has been recorded.
    fn affinity(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Affinity>, RepositoryError>> + Send;

    /// Insert or replace the memory summary for a pair.
    fn upsert_memory(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
        summary: &str,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Insert or replace the affinity score for a pair.
    fn upsert_affinity(
        &self,
        user_id: &Uuid,
        character_id: &Uuid,
        value: Affinity,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
