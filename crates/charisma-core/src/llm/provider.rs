//! LlmProvider trait definition.
//!
//! This is the seam between the turn pipeline and the chat model backend.

use charisma_types::llm::{ChatReply, ChatTurnRequest, LlmError};

/// Trait for chat model backends.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
/// Implementations live in charisma-infra (e.g., `OpenAiChatProvider`).
///
/// `generate` covers parsing too: a provider that answers with text that
/// does not match the structured reply contract returns
/// `LlmError::Malformed` rather than a raw string.
pub trait LlmProvider: Send + Sync {
    /// Human-readable provider name (e.g., "openai").
    fn name(&self) -> &str;

    /// Run one conversational turn and parse the structured reply.
    fn generate(
        &self,
        request: &ChatTurnRequest,
    ) -> impl std::future::Future<Output = Result<ChatReply, LlmError>> + Send;
}
