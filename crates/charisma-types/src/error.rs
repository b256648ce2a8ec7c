use thiserror::Error;

/// Errors from repository operations (used by trait definitions in charisma-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors from conversation and account operations.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("user not found")]
    UserNotFound,

    #[error("character not found")]
    CharacterNotFound,

    #[error("session not found")]
    SessionNotFound,

    #[error("user already registered")]
    UserAlreadyExists,

    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Errors loading application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(String),

    #[error("invalid value for {name}: {message}")]
    InvalidVar { name: String, message: String },
}
