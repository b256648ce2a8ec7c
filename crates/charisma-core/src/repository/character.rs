//! CharacterRepository trait definition.

use charisma_types::character::{Character, CharacterRef, Customization, Interaction};
use charisma_types::error::RepositoryError;
use uuid::Uuid;

/// Repository trait for characters, their customizations, and the
/// interaction log.
pub trait CharacterRepository: Send + Sync {
    /// Get a character by id.
    fn get(
        &self,
        character_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Option<Character>, RepositoryError>> + Send;

    /// Characters created by a user, newest first.
    fn list_created_by(
        &self,
        creator_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<Character>, RepositoryError>> + Send;

    /// Customization rows for a character: base rows plus the given
    /// user's rows, base rows first so user rows win when merged.
    fn list_customizations(
        &self,
        character_id: &Uuid,
        user_id: Option<&Uuid>,
    ) -> impl std::future::Future<Output = Result<Vec<Customization>, RepositoryError>> + Send;

    /// Append an interaction to the log.
    fn record_interaction(
        &self,
        interaction: &Interaction,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Distinct characters a user has interacted with, most recent first.
    fn interaction_history(
        &self,
        user_id: &Uuid,
    ) -> impl std::future::Future<Output = Result<Vec<CharacterRef>, RepositoryError>> + Send;
}
