//! Inbound platform events and turn outcomes.

use serde::{Deserialize, Serialize};

/// An inbound chat message from the platform adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Platform-assigned id of the author.
    pub platform_user_id: String,
    /// Display name as the platform reports it right now.
    pub display_name: String,
    pub content: String,
    /// Platform-side message id, carried for tracing only.
    pub message_id: Option<String>,
}

/// A state update that was actually applied during a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AppliedAction {
    Memory { value: String },
    Affinity { value: i64 },
}

/// The result of handling one inbound message.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TurnOutcome {
    /// The model replied; the text was persisted and actions applied.
    Reply {
        text: String,
        applied: Vec<AppliedAction>,
    },

    /// The model could not be reached; the text is an apology that is
    /// shown to the user but never persisted or fed back as history.
    Fallback { text: String },

    /// The user has not picked a character yet.
    NoCharacterSelected,
}

impl TurnOutcome {
    /// The text to surface to the user, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            TurnOutcome::Reply { text, .. } | TurnOutcome::Fallback { text } => Some(text),
            TurnOutcome::NoCharacterSelected => None,
        }
    }
}
