//! Character types: the personas users talk to.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A virtual character with model-facing settings.
///
/// Immutable after creation except for `settings` and layered
/// customizations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    /// Free-form instructions injected into the model's system context.
    pub settings: String,
    pub created_at: DateTime<Utc>,
}

/// An attribute/value pair layered over a character's base settings.
///
/// `user_id = None` means the row applies to everyone talking to the
/// character; user-specific rows win over base rows for the same attribute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Customization {
    pub id: Uuid,
    pub character_id: Uuid,
    pub user_id: Option<Uuid>,
    pub attribute: String,
    pub value: String,
}

/// A recorded user/character interaction (e.g., selecting a character).
///
/// Feeds the "characters you've talked to" history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub character_id: Uuid,
    pub action: String,
    pub context: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Interaction {
    /// Record that a user selected a character.
    pub fn selection(user_id: Uuid, character: &Character, display_name: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            character_id: character.id,
            action: "select".to_string(),
            context: Some(format!("{display_name} selected {}", character.name)),
            created_at: Utc::now(),
        }
    }
}

/// A lightweight character reference for history listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRef {
    pub id: Uuid,
    pub name: String,
}
