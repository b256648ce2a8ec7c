//! Conversation service: the unit of work for one inbound message, plus
//! account-level queries (character selection, points).

use charisma_types::character::{Character, CharacterRef, Interaction};
use charisma_types::config::ModelConfig;
use charisma_types::error::{ChatError, RepositoryError};
use charisma_types::event::{MessageEvent, TurnOutcome};
use charisma_types::session::ChatMessage;
use charisma_types::user::{PointTransaction, User};
use tracing::{debug, info};
use uuid::Uuid;

use crate::context::ContextAssembler;
use crate::llm::LlmProvider;
use crate::repository::{
    CharacterRepository, MessageRepository, RelationRepository, SessionRepository, UserRepository,
};

use super::backoff::Backoff;
use super::orchestrator::TurnOrchestrator;
use super::prompt::build_turn_request;

/// Handles inbound messages end to end and serves account queries.
///
/// Generic over repository traits and the model provider so the whole
/// pipeline runs against in-memory fakes in tests.
pub struct ConversationService<U, C, S, M, R, P, B> {
    users: U,
    characters: C,
    sessions: S,
    messages: M,
    assembler: ContextAssembler<C, M, R>,
    orchestrator: TurnOrchestrator<P, R, B>,
    model: String,
    max_tokens: u32,
}

impl<U, C, S, M, R, P, B> ConversationService<U, C, S, M, R, P, B>
where
    U: UserRepository,
    C: CharacterRepository + Clone,
    S: SessionRepository,
    M: MessageRepository + Clone,
    R: RelationRepository + Clone,
    P: LlmProvider,
    B: Backoff,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: U,
        characters: C,
        sessions: S,
        messages: M,
        relations: R,
        provider: P,
        backoff: B,
        config: &ModelConfig,
    ) -> Self {
        let assembler = ContextAssembler::new(
            characters.clone(),
            messages.clone(),
            relations.clone(),
            config.history_limit,
        );
        let orchestrator = TurnOrchestrator::new(
            provider,
            relations,
            backoff,
            config.max_attempts,
            config.fallback_replies.clone(),
        );
        Self {
            users,
            characters,
            sessions,
            messages,
            assembler,
            orchestrator,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        }
    }

    /// Handle one inbound message as an independent unit of work.
    ///
    /// Steps run strictly in sequence: resolve the user, find the live
    /// session, persist the user's message, assemble context, run the
    /// model turn, persist the character's reply. Fallback replies are
    /// shown but never persisted, so a provider outage cannot pollute
    /// history.
    pub async fn handle_message(&self, event: &MessageEvent) -> Result<TurnOutcome, ChatError> {
        let user = self
            .ensure_user(&event.platform_user_id, &event.display_name)
            .await?;

        let Some(character_id) = user.current_character_id else {
            debug!(user_id = %user.id, "no character selected");
            return Ok(TurnOutcome::NoCharacterSelected);
        };
        if self.characters.get(&character_id).await?.is_none() {
            return Err(ChatError::CharacterNotFound);
        }

        let session = self
            .sessions
            .find_or_create_latest(&user.id, &character_id)
            .await?;

        self.messages
            .append(&ChatMessage::from_user(session.id, user.id, &event.content))
            .await?;

        let snapshot = self.assembler.assemble(&session, &user).await?;
        let request = build_turn_request(&snapshot, &self.model, self.max_tokens);
        let outcome = self.orchestrator.converse(&snapshot, &request).await;

        if let TurnOutcome::Reply { text, .. } = &outcome {
            self.messages
                .append(&ChatMessage::from_character(session.id, text))
                .await?;
        }

        Ok(outcome)
    }

    /// Explicitly register a user.
    ///
    /// Conversation handles provisioning implicitly; this exists for the
    /// platform's register command and reports an already-taken platform
    /// id as an error instead of silently reusing it.
    pub async fn register(
        &self,
        platform_user_id: &str,
        display_name: &str,
    ) -> Result<User, ChatError> {
        let user = User::provision(platform_user_id, display_name);
        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, "registered user");
                Ok(user)
            }
            Err(RepositoryError::Conflict(_)) => Err(ChatError::UserAlreadyExists),
            Err(err) => Err(err.into()),
        }
    }

    /// Point the user at a character and log the interaction.
    pub async fn select_character(
        &self,
        platform_user_id: &str,
        display_name: &str,
        character_id: &Uuid,
    ) -> Result<Character, ChatError> {
        let user = self.ensure_user(platform_user_id, display_name).await?;
        let character = self
            .characters
            .get(character_id)
            .await?
            .ok_or(ChatError::CharacterNotFound)?;

        self.users
            .set_current_character(&user.id, Some(character_id))
            .await?;
        self.characters
            .record_interaction(&Interaction::selection(user.id, &character, &user.display_name))
            .await?;

        info!(user_id = %user.id, character_id = %character.id, "character selected");
        Ok(character)
    }

    /// The character the user is currently talking to, if any.
    pub async fn current_character(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<Character>, ChatError> {
        let user = self.require_user(platform_user_id).await?;
        match user.current_character_id {
            Some(character_id) => Ok(self.characters.get(&character_id).await?),
            None => Ok(None),
        }
    }

    /// Characters this user has created.
    pub async fn created_characters(
        &self,
        platform_user_id: &str,
    ) -> Result<Vec<Character>, ChatError> {
        let user = self.require_user(platform_user_id).await?;
        Ok(self.characters.list_created_by(&user.id).await?)
    }

    /// Characters this user has interacted with, most recent first.
    pub async fn character_history(
        &self,
        platform_user_id: &str,
    ) -> Result<Vec<CharacterRef>, ChatError> {
        let user = self.require_user(platform_user_id).await?;
        Ok(self.characters.interaction_history(&user.id).await?)
    }

    /// Current points balance.
    pub async fn points_balance(&self, platform_user_id: &str) -> Result<i64, ChatError> {
        let user = self.require_user(platform_user_id).await?;
        Ok(self.users.points_balance(&user.id).await?)
    }

    /// Recent point transfers involving this user.
    pub async fn points_history(
        &self,
        platform_user_id: &str,
        limit: i64,
    ) -> Result<Vec<PointTransaction>, ChatError> {
        let user = self.require_user(platform_user_id).await?;
        Ok(self.users.points_history(&user.id, limit).await?)
    }

    /// Resolve a platform id to a user, provisioning on first contact.
    async fn ensure_user(
        &self,
        platform_user_id: &str,
        display_name: &str,
    ) -> Result<User, ChatError> {
        if let Some(user) = self.users.find_by_platform_id(platform_user_id).await? {
            return Ok(user);
        }

        let user = User::provision(platform_user_id, display_name);
        match self.users.create(&user).await {
            Ok(()) => {
                info!(user_id = %user.id, "auto-provisioned user on first contact");
                Ok(user)
            }
            // Lost a provisioning race; the winner's row is authoritative.
            Err(RepositoryError::Conflict(_)) => self
                .users
                .find_by_platform_id(platform_user_id)
                .await?
                .ok_or(ChatError::UserNotFound),
            Err(err) => Err(err.into()),
        }
    }

    async fn require_user(&self, platform_user_id: &str) -> Result<User, ChatError> {
        self.users
            .find_by_platform_id(platform_user_id)
            .await?
            .ok_or(ChatError::UserNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::backoff::NoBackoff;
    use charisma_types::llm::{ChatReply, ChatTurnRequest, LlmError};
    use charisma_types::relation::{Affinity, Memory};
    use charisma_types::session::ChatSession;
    use charisma_types::character::Customization;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Inner {
        users: Mutex<Vec<User>>,
        characters: Mutex<Vec<Character>>,
        sessions: Mutex<Vec<ChatSession>>,
        messages: Mutex<Vec<ChatMessage>>,
        memories: Mutex<HashMap<(Uuid, Uuid), String>>,
        affinities: Mutex<HashMap<(Uuid, Uuid), i64>>,
        interactions: Mutex<Vec<Interaction>>,
    }

    #[derive(Clone, Default)]
    struct InMemoryStore(Arc<Inner>);

    impl UserRepository for InMemoryStore {
        async fn find_by_platform_id(
            &self,
            platform_user_id: &str,
        ) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .0
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.platform_user_id == platform_user_id)
                .cloned())
        }

        async fn get(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
            Ok(self
                .0
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == *user_id)
                .cloned())
        }

        async fn create(&self, user: &User) -> Result<(), RepositoryError> {
            let mut users = self.0.users.lock().unwrap();
            if users
                .iter()
                .any(|u| u.platform_user_id == user.platform_user_id)
            {
                return Err(RepositoryError::Conflict("platform id taken".to_string()));
            }
            users.push(user.clone());
            Ok(())
        }

        async fn set_current_character(
            &self,
            user_id: &Uuid,
            character_id: Option<&Uuid>,
        ) -> Result<(), RepositoryError> {
            let mut users = self.0.users.lock().unwrap();
            let user = users
                .iter_mut()
                .find(|u| u.id == *user_id)
                .ok_or(RepositoryError::NotFound)?;
            user.current_character_id = character_id.copied();
            Ok(())
        }

        async fn points_balance(&self, user_id: &Uuid) -> Result<i64, RepositoryError> {
            self.0
                .users
                .lock()
                .unwrap()
                .iter()
                .find(|u| u.id == *user_id)
                .map(|u| u.points_balance)
                .ok_or(RepositoryError::NotFound)
        }

        async fn points_history(
            &self,
            _user_id: &Uuid,
            _limit: i64,
        ) -> Result<Vec<PointTransaction>, RepositoryError> {
            Ok(vec![])
        }
    }

    impl CharacterRepository for InMemoryStore {
        async fn get(&self, character_id: &Uuid) -> Result<Option<Character>, RepositoryError> {
            Ok(self
                .0
                .characters
                .lock()
                .unwrap()
                .iter()
                .find(|c| c.id == *character_id)
                .cloned())
        }

        async fn list_created_by(
            &self,
            creator_id: &Uuid,
        ) -> Result<Vec<Character>, RepositoryError> {
            Ok(self
                .0
                .characters
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.creator_id == *creator_id)
                .cloned()
                .collect())
        }

        async fn list_customizations(
            &self,
            _character_id: &Uuid,
            _user_id: Option<&Uuid>,
        ) -> Result<Vec<Customization>, RepositoryError> {
            Ok(vec![])
        }

        async fn record_interaction(
            &self,
            interaction: &Interaction,
        ) -> Result<(), RepositoryError> {
            self.0.interactions.lock().unwrap().push(interaction.clone());
            Ok(())
        }

        async fn interaction_history(
            &self,
            user_id: &Uuid,
        ) -> Result<Vec<CharacterRef>, RepositoryError> {
            let interactions = self.0.interactions.lock().unwrap();
            let characters = self.0.characters.lock().unwrap();
            let mut refs = Vec::new();
            for interaction in interactions.iter().rev() {
                if interaction.user_id != *user_id {
                    continue;
                }
                if refs
                    .iter()
                    .any(|r: &CharacterRef| r.id == interaction.character_id)
                {
                    continue;
                }
                if let Some(character) =
                    characters.iter().find(|c| c.id == interaction.character_id)
                {
                    refs.push(CharacterRef {
                        id: character.id,
                        name: character.name.clone(),
                    });
                }
            }
            Ok(refs)
        }
    }

    impl SessionRepository for InMemoryStore {
        async fn get(&self, session_id: &Uuid) -> Result<Option<ChatSession>, RepositoryError> {
            Ok(self
                .0
                .sessions
                .lock()
                .unwrap()
                .iter()
                .find(|s| s.id == *session_id)
                .cloned())
        }

        async fn find_or_create_latest(
            &self,
            user_id: &Uuid,
            character_id: &Uuid,
        ) -> Result<ChatSession, RepositoryError> {
            let mut sessions = self.0.sessions.lock().unwrap();
            if let Some(session) = sessions
                .iter()
                .filter(|s| s.user_id == *user_id && s.character_id == *character_id)
                .max_by_key(|s| s.started_at)
            {
                return Ok(session.clone());
            }
            let session = ChatSession::open(*user_id, *character_id);
            sessions.push(session.clone());
            Ok(session)
        }
    }

    impl MessageRepository for InMemoryStore {
        async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
            self.0.messages.lock().unwrap().push(message.clone());
            Ok(())
        }

        async fn recent(
            &self,
            session_id: &Uuid,
            limit: i64,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            let messages = self.0.messages.lock().unwrap();
            let mut matching: Vec<_> = messages
                .iter()
                .filter(|m| m.session_id == *session_id)
                .cloned()
                .collect();
            matching.reverse();
            matching.truncate(limit as usize);
            Ok(matching)
        }
    }

    impl RelationRepository for InMemoryStore {
        async fn memory(
            &self,
            user_id: &Uuid,
            character_id: &Uuid,
        ) -> Result<Option<Memory>, RepositoryError> {
            Ok(self
                .0
                .memories
                .lock()
                .unwrap()
                .get(&(*user_id, *character_id))
                .map(|summary| Memory {
                    user_id: *user_id,
                    character_id: *character_id,
                    summary: summary.clone(),
                    updated_at: Utc::now(),
                }))
        }

        async fn affinity(
            &self,
            user_id: &Uuid,
            character_id: &Uuid,
        ) -> Result<Option<Affinity>, RepositoryError> {
            Ok(self
                .0
                .affinities
                .lock()
                .unwrap()
                .get(&(*user_id, *character_id))
                .map(|v| Affinity::clamped(*v)))
        }

        async fn upsert_memory(
            &self,
            user_id: &Uuid,
            character_id: &Uuid,
            summary: &str,
        ) -> Result<(), RepositoryError> {
            self.0
                .memories
                .lock()
                .unwrap()
                .insert((*user_id, *character_id), summary.to_string());
            Ok(())
        }

        async fn upsert_affinity(
            &self,
            user_id: &Uuid,
            character_id: &Uuid,
            value: Affinity,
        ) -> Result<(), RepositoryError> {
            self.0
                .affinities
                .lock()
                .unwrap()
                .insert((*user_id, *character_id), value.value());
            Ok(())
        }
    }

    struct FixedProvider {
        result: fn() -> Result<ChatReply, LlmError>,
    }

    impl LlmProvider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn generate(&self, _request: &ChatTurnRequest) -> Result<ChatReply, LlmError> {
            (self.result)()
        }
    }

    type TestService = ConversationService<
        InMemoryStore,
        InMemoryStore,
        InMemoryStore,
        InMemoryStore,
        InMemoryStore,
        FixedProvider,
        NoBackoff,
    >;

    fn service(store: InMemoryStore, result: fn() -> Result<ChatReply, LlmError>) -> TestService {
        let config = ModelConfig {
            fallback_replies: vec!["sorry".to_string()],
            ..Default::default()
        };
        ConversationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            store.clone(),
            store,
            FixedProvider { result },
            NoBackoff,
            &config,
        )
    }

    fn seed_character(store: &InMemoryStore, creator_id: Uuid) -> Character {
        let character = Character {
            id: Uuid::now_v7(),
            name: "Aria".to_string(),
            description: "A bard".to_string(),
            creator_id,
            settings: "You are Aria.".to_string(),
            created_at: Utc::now(),
        };
        store.0.characters.lock().unwrap().push(character.clone());
        character
    }

    fn event(content: &str) -> MessageEvent {
        MessageEvent {
            platform_user_id: "discord-42".to_string(),
            display_name: "Ada".to_string(),
            content: content.to_string(),
            message_id: None,
        }
    }

    #[tokio::test]
    async fn test_first_message_provisions_user() {
        let store = InMemoryStore::default();
        let service = service(store.clone(), || {
            Ok(ChatReply {
                message: "hi".to_string(),
                actions: vec![],
            })
        });

        let outcome = service.handle_message(&event("hello")).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::NoCharacterSelected));
        // The user exists even though no turn ran.
        assert!(
            store
                .0
                .users
                .lock()
                .unwrap()
                .iter()
                .any(|u| u.platform_user_id == "discord-42")
        );
    }

    #[tokio::test]
    async fn test_reply_persists_both_messages() {
        let store = InMemoryStore::default();
        let service = service(store.clone(), || {
            Ok(ChatReply {
                message: "hello Ada".to_string(),
                actions: vec![],
            })
        });

        let user = service.register("discord-42", "Ada").await.unwrap();
        let character = seed_character(&store, user.id);
        service
            .select_character("discord-42", "Ada", &character.id)
            .await
            .unwrap();

        let outcome = service.handle_message(&event("hello")).await.unwrap();
        assert!(matches!(outcome, TurnOutcome::Reply { .. }));

        let messages = store.0.messages.lock().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].author_id, Some(user.id));
        assert_eq!(messages[1].author_id, None);
        assert_eq!(messages[1].content, "hello Ada");
    }

    #[tokio::test]
    async fn test_fallback_reply_not_persisted() {
        let store = InMemoryStore::default();
        let service = service(store.clone(), || Err(LlmError::Timeout));

        let user = service.register("discord-42", "Ada").await.unwrap();
        let character = seed_character(&store, user.id);
        service
            .select_character("discord-42", "Ada", &character.id)
            .await
            .unwrap();

        let outcome = service.handle_message(&event("hello")).await.unwrap();
        match outcome {
            TurnOutcome::Fallback { text } => assert_eq!(text, "sorry"),
            other => panic!("expected fallback, got {other:?}"),
        }

        // Only the user's message was persisted.
        let messages = store.0.messages.lock().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author_id, Some(user.id));
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let store = InMemoryStore::default();
        let service = service(store, || Err(LlmError::Timeout));

        service.register("discord-42", "Ada").await.unwrap();
        let err = service.register("discord-42", "Ada").await.unwrap_err();
        assert!(matches!(err, ChatError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn test_select_unknown_character() {
        let store = InMemoryStore::default();
        let service = service(store, || Err(LlmError::Timeout));

        let err = service
            .select_character("discord-42", "Ada", &Uuid::now_v7())
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::CharacterNotFound));
    }

    #[tokio::test]
    async fn test_selection_recorded_in_history() {
        let store = InMemoryStore::default();
        let service = service(store.clone(), || Err(LlmError::Timeout));

        let user = service.register("discord-42", "Ada").await.unwrap();
        let character = seed_character(&store, user.id);
        service
            .select_character("discord-42", "Ada", &character.id)
            .await
            .unwrap();

        let history = service.character_history("discord-42").await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].name, "Aria");

        let current = service.current_character("discord-42").await.unwrap();
        assert_eq!(current.map(|c| c.id), Some(character.id));
    }

    #[tokio::test]
    async fn test_queries_require_known_user() {
        let store = InMemoryStore::default();
        let service = service(store, || Err(LlmError::Timeout));

        let err = service.points_balance("nobody").await.unwrap_err();
        assert!(matches!(err, ChatError::UserNotFound));
    }
}
