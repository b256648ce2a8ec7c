//! User account HTTP handlers: registration, character selection, points.
//!
//! Endpoints:
//! - POST /api/v1/users                               - Register a user
//! - PUT  /api/v1/users/{platform_id}/character       - Select a character
//! - GET  /api/v1/users/{platform_id}/character       - Current character
//! - GET  /api/v1/users/{platform_id}/characters      - Characters the user created
//! - GET  /api/v1/users/{platform_id}/characters/history - Interaction history
//! - GET  /api/v1/users/{platform_id}/points          - Points balance
//! - GET  /api/v1/users/{platform_id}/points/history  - Recent point transfers

use std::time::Instant;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::http::error::AppError;
use crate::http::handlers::parse_uuid;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub platform_user_id: String,
    pub display_name: String,
}

/// Request body for character selection.
#[derive(Debug, Deserialize)]
pub struct SelectCharacterRequest {
    pub display_name: String,
    pub character_id: String,
}

/// Query parameters for points history listing.
#[derive(Debug, Deserialize)]
pub struct PointsHistoryQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

/// POST /api/v1/users - Register a user explicitly.
pub async fn register_user(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    if req.platform_user_id.trim().is_empty() {
        return Err(AppError::Validation("platform_user_id is empty".to_string()));
    }

    let user = state
        .conversation
        .register(&req.platform_user_id, &req.display_name)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let user_json = serde_json::to_value(&user)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(user_json, request_id, elapsed)
        .with_link("self", &format!("/api/v1/users/{}", user.platform_user_id)))
}

/// PUT /api/v1/users/{platform_id}/character - Select a character.
pub async fn select_character(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
    Json(req): Json<SelectCharacterRequest>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let character_id = parse_uuid(&req.character_id)?;

    let character = state
        .conversation
        .select_character(&platform_id, &req.display_name, &character_id)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let character_json = serde_json::to_value(&character)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(character_json, request_id, elapsed)
        .with_link("character", &format!("/api/v1/characters/{}", character.id)))
}

/// GET /api/v1/users/{platform_id}/character - The character currently selected.
pub async fn current_character(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let character = state.conversation.current_character(&platform_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let character_json = serde_json::to_value(&character)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(character_json, request_id, elapsed))
}

/// GET /api/v1/users/{platform_id}/characters - Characters this user created.
pub async fn created_characters(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let characters = state.conversation.created_characters(&platform_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let characters_json = characters
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(characters_json, request_id, elapsed))
}

/// GET /api/v1/users/{platform_id}/characters/history - Interaction history,
/// most recent first.
pub async fn character_history(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let refs = state.conversation.character_history(&platform_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let refs_json = refs
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(refs_json, request_id, elapsed))
}

/// GET /api/v1/users/{platform_id}/points - Current points balance.
pub async fn points_balance(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
) -> Result<ApiResponse<serde_json::Value>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let balance = state.conversation.points_balance(&platform_id).await?;

    let elapsed = start.elapsed().as_millis() as u64;

    Ok(ApiResponse::success(
        serde_json::json!({"balance": balance}),
        request_id,
        elapsed,
    )
    .with_link(
        "history",
        &format!("/api/v1/users/{platform_id}/points/history"),
    ))
}

/// GET /api/v1/users/{platform_id}/points/history - Recent point transfers.
pub async fn points_history(
    State(state): State<AppState>,
    Path(platform_id): Path<String>,
    Query(query): Query<PointsHistoryQuery>,
) -> Result<ApiResponse<Vec<serde_json::Value>>, AppError> {
    let start = Instant::now();
    let request_id = Uuid::now_v7().to_string();

    let transactions = state
        .conversation
        .points_history(&platform_id, query.limit)
        .await?;

    let elapsed = start.elapsed().as_millis() as u64;

    let transactions_json = transactions
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(ApiResponse::success(transactions_json, request_id, elapsed))
}
