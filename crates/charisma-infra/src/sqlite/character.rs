//! SQLite character repository implementation.
//!
//! Covers characters, their layered customizations, and the interaction
//! log that backs the "characters you've talked to" history.

use charisma_core::repository::CharacterRepository;
use charisma_types::character::{Character, CharacterRef, Customization, Interaction};
use charisma_types::error::RepositoryError;
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_err, parse_datetime};

/// SQLite-backed implementation of `CharacterRepository`.
#[derive(Clone)]
pub struct SqliteCharacterRepository {
    pool: DatabasePool,
}

impl SqliteCharacterRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Insert a new character. Used by seeding and by the creation flow.
    pub async fn create(&self, character: &Character) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO characters (id, name, description, creator_id, settings, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(character.id.to_string())
        .bind(&character.name)
        .bind(&character.description)
        .bind(character.creator_id.to_string())
        .bind(&character.settings)
        .bind(format_datetime(&character.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    /// Insert a customization row (base when `user_id` is None).
    pub async fn add_customization(
        &self,
        customization: &Customization,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO customizations (id, character_id, user_id, attribute, value)
               VALUES (?, ?, ?, ?, ?)"#,
        )
        .bind(customization.id.to_string())
        .bind(customization.character_id.to_string())
        .bind(customization.user_id.map(|id| id.to_string()))
        .bind(&customization.attribute)
        .bind(&customization.value)
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct CharacterRow {
    id: String,
    name: String,
    description: String,
    creator_id: String,
    settings: String,
    created_at: String,
}

impl CharacterRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            description: row.try_get("description")?,
            creator_id: row.try_get("creator_id")?,
            settings: row.try_get("settings")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_character(self) -> Result<Character, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid character id: {e}")))?;
        let creator_id = Uuid::parse_str(&self.creator_id)
            .map_err(|e| RepositoryError::Query(format!("invalid creator_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Character {
            id,
            name: self.name,
            description: self.description,
            creator_id,
            settings: self.settings,
            created_at,
        })
    }
}

struct CustomizationRow {
    id: String,
    character_id: String,
    user_id: Option<String>,
    attribute: String,
    value: String,
}

impl CustomizationRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            character_id: row.try_get("character_id")?,
            user_id: row.try_get("user_id")?,
            attribute: row.try_get("attribute")?,
            value: row.try_get("value")?,
        })
    }

    fn into_customization(self) -> Result<Customization, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid customization id: {e}")))?;
        let character_id = Uuid::parse_str(&self.character_id)
            .map_err(|e| RepositoryError::Query(format!("invalid character_id: {e}")))?;
        let user_id = self
            .user_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid user_id: {e}")))?;

        Ok(Customization {
            id,
            character_id,
            user_id,
            attribute: self.attribute,
            value: self.value,
        })
    }
}

// ---------------------------------------------------------------------------
// CharacterRepository implementation
// ---------------------------------------------------------------------------

impl CharacterRepository for SqliteCharacterRepository {
    async fn get(&self, character_id: &Uuid) -> Result<Option<Character>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM characters WHERE id = ?")
            .bind(character_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let character_row = CharacterRow::from_row(&row).map_err(map_sqlx_err)?;
                Ok(Some(character_row.into_character()?))
            }
            None => Ok(None),
        }
    }

    async fn list_created_by(&self, creator_id: &Uuid) -> Result<Vec<Character>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM characters WHERE creator_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(creator_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        let mut characters = Vec::with_capacity(rows.len());
        for row in &rows {
            let character_row = CharacterRow::from_row(row).map_err(map_sqlx_err)?;
            characters.push(character_row.into_character()?);
        }

        Ok(characters)
    }

    async fn list_customizations(
        &self,
        character_id: &Uuid,
        user_id: Option<&Uuid>,
    ) -> Result<Vec<Customization>, RepositoryError> {
        // Base rows (NULL user_id) first so callers merging in order end
        // up with user-specific values winning.
        let rows = sqlx::query(
            r#"SELECT * FROM customizations
               WHERE character_id = ? AND (user_id IS NULL OR user_id = ?)
               ORDER BY user_id IS NOT NULL, id"#,
        )
        .bind(character_id.to_string())
        .bind(user_id.map(|id| id.to_string()))
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        let mut customizations = Vec::with_capacity(rows.len());
        for row in &rows {
            let customization_row = CustomizationRow::from_row(row).map_err(map_sqlx_err)?;
            customizations.push(customization_row.into_customization()?);
        }

        Ok(customizations)
    }

    async fn record_interaction(&self, interaction: &Interaction) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO interactions (id, user_id, character_id, action, context, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(interaction.id.to_string())
        .bind(interaction.user_id.to_string())
        .bind(interaction.character_id.to_string())
        .bind(&interaction.action)
        .bind(&interaction.context)
        .bind(format_datetime(&interaction.created_at))
        .execute(&self.pool.writer)
        .await
        .map_err(map_sqlx_err)?;

        Ok(())
    }

    async fn interaction_history(
        &self,
        user_id: &Uuid,
    ) -> Result<Vec<CharacterRef>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT c.id, c.name, MAX(i.created_at) AS last_interaction
               FROM interactions i
               JOIN characters c ON c.id = i.character_id
               WHERE i.user_id = ?
               GROUP BY c.id, c.name
               ORDER BY last_interaction DESC"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        let mut refs = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.try_get("id").map_err(map_sqlx_err)?;
            let name: String = row.try_get("name").map_err(map_sqlx_err)?;
            let id = Uuid::parse_str(&id)
                .map_err(|e| RepositoryError::Query(format!("invalid character id: {e}")))?;
            refs.push(CharacterRef { id, name });
        }

        Ok(refs)
    }
}
