//! Chat session and message types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One conversation between a user and a character.
///
/// Sessions only accumulate; the latest session for a pair is the live
/// one and a new session is opened when none exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub character_id: Uuid,
    pub started_at: DateTime<Utc>,
}

impl ChatSession {
    pub fn open(user_id: Uuid, character_id: Uuid) -> Self {
        Self {
            id: Uuid::now_v7(),
            user_id,
            character_id,
            started_at: Utc::now(),
        }
    }
}

/// A single message within a session.
///
/// `author_id = None` means the character spoke; `Some(user_id)` means
/// the user did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub author_id: Option<Uuid>,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn from_user(session_id: Uuid, user_id: Uuid, content: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            author_id: Some(user_id),
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn from_character(session_id: Uuid, content: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            session_id,
            author_id: None,
            content: content.to_string(),
            created_at: Utc::now(),
        }
    }

    pub fn is_from_user(&self) -> bool {
        self.author_id.is_some()
    }
}
