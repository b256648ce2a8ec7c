//! Infrastructure implementations for Charisma.
//!
//! Concrete backends for the traits defined in charisma-core: SQLite
//! repositories over a split read/write pool, the OpenAI chat provider,
//! and environment-based configuration loading.

pub mod config;
pub mod llm;
pub mod sqlite;
