//! Shared domain types for Charisma.
//!
//! Everything here is plain data: entities, wire shapes, typed errors,
//! and configuration. No IO, no storage, no HTTP.

pub mod character;
pub mod config;
pub mod context;
pub mod error;
pub mod event;
pub mod llm;
pub mod relation;
pub mod session;
pub mod user;
