//! Model request/response types for Charisma.
//!
//! These types model the data shapes for chat model interactions:
//! turn requests, the structured reply contract, state-update actions,
//! and error handling.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a message in a model conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "system" => Ok(MessageRole::System),
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A single message in a model conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnMessage {
    pub role: MessageRole,
    pub content: String,
}

impl ChatTurnMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            content: content.into(),
        }
    }
}

/// Request to a chat model provider for one conversational turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurnRequest {
    pub model: String,
    pub messages: Vec<ChatTurnMessage>,
    pub max_tokens: u32,
}

/// A state-update action proposed by the model alongside its reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ModelAction {
    /// Replace the character's memory summary about this user.
    Memory { value: String },

    /// Set the character's affinity toward this user (0-100, as text).
    Affinity { value: String },
}

/// The structured reply contract the model must honor.
///
/// `message` is shown to the user; `actions` feed the state-update
/// pipeline. Unknown or malformed actions are skipped, never fatal.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ChatReply {
    pub message: String,
    #[serde(default)]
    pub actions: Vec<ModelAction>,
}

/// Errors from chat model provider operations.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("provider error: {message}")]
    Provider { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("rate limited (retry after {retry_after_ms:?}ms)")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("provider overloaded: {0}")]
    Overloaded(String),

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("malformed reply: {0}")]
    Malformed(String),

    #[error("provider returned an empty reply")]
    EmptyReply,
}

impl LlmError {
    /// Whether retrying the same request could plausibly succeed.
    ///
    /// Authentication and request-shape failures are structural; retrying
    /// them only burns attempts.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            LlmError::Provider { .. }
                | LlmError::Timeout
                | LlmError::RateLimited { .. }
                | LlmError::Overloaded(_)
                | LlmError::EmptyReply
        )
    }
}
