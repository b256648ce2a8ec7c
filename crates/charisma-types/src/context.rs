//! Assembled conversational context for one turn.

use crate::llm::ChatTurnMessage;
use crate::relation::Affinity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Everything the prompt builder needs for one turn, read in a single
/// pass before the model is called.
///
/// `history` is ordered oldest-first and already capped; user messages
/// carry their author tag so the model can tell speakers apart.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextSnapshot {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub character_id: Uuid,
    pub history: Vec<ChatTurnMessage>,
    /// Rolling memory summary; empty string when the pair has none yet.
    pub memory: String,
    pub affinity: Affinity,
    pub character_settings: String,
    /// Merged customization attributes, user-specific rows already
    /// layered over base rows.
    pub overrides: BTreeMap<String, String>,
}
