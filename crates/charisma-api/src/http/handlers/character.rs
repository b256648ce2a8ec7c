//! Character HTTP handlers.
//!
//! Endpoints:
//! - GET /api/v1/characters/{id}                - Get a character by id
//! - GET /api/v1/characters/{id}/customizations - Base customizations, plus a
//!   user's overrides when `user_id` is given

use std::time::Instant;

use axum::extract::{Path, Query, State};
use serde::Deserialize;
use uuid::Uuid;

use charisma_core::repository::CharacterRepository;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Query parameters for customization listing.
#[derive(Debug, Deserialize)]
pub struct CustomizationQuery {
    pub user_id: Option<String>,
}

/// GET /api/v1/characters/{id} - Get a character by id.
pub async fn get_character(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let character_id = parse_uuid(&id)?;

    let character = state
        .characters
        .get(&character_id)
        .await
        .map_err(|e| AppError::Chat(e.into()))?
        .ok_or(AppError::Chat(
            charisma_types::error::ChatError::CharacterNotFound,
        ))?;

    let elapsed = start.elapsed().as_millis() as u64;

    let character_json = serde_json::to_value(&character)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(character_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/characters/{}", character.id))
        .with_link(
            "customizations",
            &format!("/api/v1/characters/{}/customizations", character.id),
        ))
}

/// GET /api/v1/characters/{id}/customizations - List customizations.
pub async fn list_customizations(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<CustomizationQuery>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let character_id = parse_uuid(&id)?;
    let user_id = match &query.user_id {
        Some(raw) => Some(parse_uuid(raw)?),
        None => None,
    };

    let customizations = state
        .characters
        .list_customizations(&character_id, user_id.as_ref())
        .await
        .map_err(|e| AppError::Chat(e.into()))?;

    let elapsed = start.elapsed().as_millis() as u64;

    let customizations_json = customizations
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(customizations_json, request_id, elapsed))
}
