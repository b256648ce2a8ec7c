//! Axum router configuration with middleware.
//!
//! All routes are under `/api/v1/`.
//! Middleware: CORS, tracing.

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::state::AppState;

/// Build the complete API router with all routes and middleware.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Inbound messages
        .route("/messages", post(handlers::message::post_message))
        // Users
        .route("/users", post(handlers::user::register_user))
        .route(
            "/users/{platform_id}/character",
            put(handlers::user::select_character).get(handlers::user::current_character),
        )
        .route(
            "/users/{platform_id}/characters",
            get(handlers::user::created_characters),
        )
        .route(
            "/users/{platform_id}/characters/history",
            get(handlers::user::character_history),
        )
        .route(
            "/users/{platform_id}/points",
            get(handlers::user::points_balance),
        )
        .route(
            "/users/{platform_id}/points/history",
            get(handlers::user::points_history),
        )
        // Characters
        .route("/characters/{id}", get(handlers::character::get_character))
        .route(
            "/characters/{id}/customizations",
            get(handlers::character::list_customizations),
        );

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - Simple health check endpoint.
async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
