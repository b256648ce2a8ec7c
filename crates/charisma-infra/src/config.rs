//! Environment-based configuration loader for Charisma.
//!
//! A missing bot token is fatal: the service cannot receive messages
//! without it. A missing model API key only logs a warning; every turn
//! then takes the fallback path instead of calling the provider.

use std::path::PathBuf;

use charisma_types::config::{AppConfig, DatabaseConfig, ModelConfig, PlatformConfig};
use charisma_types::error::ConfigError;
use secrecy::SecretString;

/// Load configuration from process environment variables.
pub fn from_env() -> Result<AppConfig, ConfigError> {
    from_lookup(|key| std::env::var(key).ok())
}

/// Load configuration from an arbitrary key lookup.
///
/// Tests pass a closure over a map instead of mutating process env.
pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<AppConfig, ConfigError> {
    let bot_token = lookup("PLATFORM_BOT_TOKEN")
        .ok_or_else(|| ConfigError::MissingVar("PLATFORM_BOT_TOKEN".to_string()))?;

    let api_key = lookup("MODEL_API_KEY");
    if api_key.is_none() {
        tracing::warn!("MODEL_API_KEY not set; turns will use fallback replies only");
    }

    let data_dir = lookup("CHARISMA_DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".charisma")
    });

    let mut database = DatabaseConfig::with_path(data_dir.join("charisma.db"));
    if let Some(size) = parse_var(&lookup, "CHARISMA_DB_POOL_SIZE")? {
        database.pool_size = size;
    }
    if let Some(secs) = parse_var(&lookup, "CHARISMA_DB_CONNECT_TIMEOUT_SECS")? {
        database.connect_timeout_secs = secs;
    }
    if let Some(secs) = parse_var(&lookup, "CHARISMA_DB_RECYCLE_AFTER_SECS")? {
        database.recycle_after_secs = secs;
    }

    let mut model = ModelConfig {
        api_key: api_key.map(SecretString::from),
        ..Default::default()
    };
    if let Some(base_url) = lookup("MODEL_BASE_URL") {
        model.base_url = base_url;
    }
    if let Some(name) = lookup("MODEL_NAME") {
        model.model = name;
    }
    if let Some(limit) = parse_var(&lookup, "MODEL_HISTORY_LIMIT")? {
        model.history_limit = limit;
    }
    if let Some(attempts) = parse_var(&lookup, "MODEL_MAX_ATTEMPTS")? {
        model.max_attempts = attempts;
    }

    Ok(AppConfig {
        database,
        model,
        platform: PlatformConfig {
            bot_token: SecretString::from(bot_token),
        },
    })
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::InvalidVar {
                name: name.to_string(),
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}
