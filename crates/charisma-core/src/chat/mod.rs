//! The conversational turn pipeline: prompt construction, the model-call
//! state machine with retries, and the user-facing service.

mod backoff;
mod orchestrator;
mod prompt;
mod service;

pub use backoff::{Backoff, ExponentialBackoff, NoBackoff};
pub use orchestrator::{TurnOrchestrator, TurnPhase};
pub use prompt::build_turn_request;
pub use service::ConversationService;
