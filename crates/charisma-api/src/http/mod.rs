//! HTTP/REST API layer for Charisma.
//!
//! Axum-based REST API at `/api/v1/` with envelope response format and
//! CORS support. This surface stands in for the chat-platform adapter
//! boundary: inbound message events arrive as plain HTTP posts.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
