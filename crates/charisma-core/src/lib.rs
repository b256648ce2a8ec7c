//! Business logic for Charisma: repository traits, context assembly,
//! and the conversational turn pipeline.
//!
//! Everything here is storage- and transport-agnostic; concrete
//! implementations live in charisma-infra.

pub mod chat;
pub mod context;
pub mod llm;
pub mod repository;
