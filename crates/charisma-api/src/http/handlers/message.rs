//! Inbound message HTTP handler.
//!
//! Endpoint:
//! - POST /api/v1/messages - Handle one inbound chat message end to end

use std::time::Instant;

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use charisma_types::event::{MessageEvent, TurnOutcome};

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Response payload for a handled message.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Text to surface to the user, absent when no character is selected.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply: Option<String>,
    /// Full turn outcome (reply, fallback, or no character selected).
    #[serde(flatten)]
    pub outcome: TurnOutcome,
    /// Echo of the platform-side message id, when the event carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// POST /api/v1/messages - Handle one inbound message.
pub async fn post_message(
    State(state): State<AppState>,
    Json(event): Json<MessageEvent>,
) -> Result<ApiResponse<MessageResponse>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if event.content.trim().is_empty() {
        return Err(AppError::Validation("Message content is empty".to_string()));
    }

    let outcome = state.conversation.handle_message(&event).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let payload = MessageResponse {
        reply: outcome.text().map(str::to_string),
        outcome,
        message_id: event.message_id,
    };

    Ok(ApiResponse::success(payload, request_id, elapsed)
        .with_link("self", "/api/v1/messages"))
}
