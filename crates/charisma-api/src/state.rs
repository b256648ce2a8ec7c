//! Application state wiring all services together.
//!
//! The conversation service is generic over repository and provider traits;
//! AppState pins it to the concrete infra implementations.

use std::sync::Arc;

use charisma_core::chat::{ConversationService, ExponentialBackoff};
use charisma_infra::config;
use charisma_infra::llm::openai::OpenAiChatProvider;
use charisma_infra::sqlite::character::SqliteCharacterRepository;
use charisma_infra::sqlite::message::SqliteMessageRepository;
use charisma_infra::sqlite::pool::DatabasePool;
use charisma_infra::sqlite::relation::SqliteRelationRepository;
use charisma_infra::sqlite::session::SqliteSessionRepository;
use charisma_infra::sqlite::user::SqliteUserRepository;

/// Concrete type alias for the conversation service pinned to infra
/// implementations.
pub type ConcreteConversationService = ConversationService<
    SqliteUserRepository,
    SqliteCharacterRepository,
    SqliteSessionRepository,
    SqliteMessageRepository,
    SqliteRelationRepository,
    OpenAiChatProvider,
    ExponentialBackoff,
>;

/// Shared application state holding the wired services.
#[derive(Clone)]
pub struct AppState {
    pub conversation: Arc<ConcreteConversationService>,
    pub characters: SqliteCharacterRepository,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: load config, connect to the
    /// database, wire repositories and the model provider.
    pub async fn init() -> anyhow::Result<Self> {
        let config = config::from_env()?;

        let db_pool = DatabasePool::connect(&config.database).await?;

        let users = SqliteUserRepository::new(db_pool.clone());
        let characters = SqliteCharacterRepository::new(db_pool.clone());
        let sessions = SqliteSessionRepository::new(db_pool.clone());
        let messages = SqliteMessageRepository::new(db_pool.clone());
        let relations = SqliteRelationRepository::new(db_pool.clone());

        let provider = OpenAiChatProvider::new(&config.model);
        let backoff = ExponentialBackoff::from_millis(config.model.backoff_base_ms);

        let conversation = ConversationService::new(
            users,
            characters.clone(),
            sessions,
            messages,
            relations,
            provider,
            backoff,
            &config.model,
        );

        Ok(Self {
            conversation: Arc::new(conversation),
            characters,
            db_pool,
        })
    }
}
