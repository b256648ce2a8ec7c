//! Application configuration types for Charisma.
//!
//! Values come from the environment (see `charisma-infra`); this module
//! only defines the shapes and their defaults.

use secrecy::SecretString;
use std::path::PathBuf;

/// Top-level configuration for the Charisma backend.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub platform: PlatformConfig,
}

/// SQLite pool settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the database file; parent directories are created on connect.
    pub path: PathBuf,
    /// Reader pool size; the writer pool is always a single connection.
    pub pool_size: u32,
    pub connect_timeout_secs: u64,
    /// Connections older than this are recycled instead of reused.
    pub recycle_after_secs: u64,
}

impl DatabaseConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout_secs(),
            recycle_after_secs: default_recycle_after_secs(),
        }
    }
}

/// Chat model provider settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Missing key is tolerated at startup; every turn then takes the
    /// fallback path instead of calling the provider.
    pub api_key: Option<SecretString>,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Total attempts per turn, including the first.
    pub max_attempts: u32,
    pub backoff_base_ms: u64,
    /// Maximum number of history messages included in a turn's context.
    pub history_limit: usize,
    /// Apology texts used when all attempts fail; one is picked at random.
    pub fallback_replies: Vec<String>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout_secs(),
            max_attempts: default_max_attempts(),
            backoff_base_ms: default_backoff_base_ms(),
            history_limit: default_history_limit(),
            fallback_replies: default_fallback_replies(),
        }
    }
}

/// Chat platform adapter settings.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    /// Bot credential for the chat platform. Required: without it the
    /// service cannot receive messages at all.
    pub bot_token: SecretString,
}

fn default_pool_size() -> u32 {
    5
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_recycle_after_secs() -> u64 {
    3600
}

fn default_base_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_max_tokens() -> u32 {
    1024
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base_ms() -> u64 {
    500
}

fn default_history_limit() -> usize {
    100
}

fn default_fallback_replies() -> Vec<String> {
    vec![
        "Sorry, I spaced out for a moment there. What were you saying?".to_string(),
        "Hmm, my thoughts got tangled. Could you say that again?".to_string(),
        "I'm having trouble finding my words right now. Give me a moment?".to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::default();
        assert!(config.api_key.is_none());
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.history_limit, 100);
        assert!(!config.fallback_replies.is_empty());
    }

    #[test]
    fn test_database_config_with_path() {
        let config = DatabaseConfig::with_path("/tmp/charisma.db");
        assert_eq!(config.pool_size, 5);
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(config.recycle_after_secs, 3600);
    }
}
