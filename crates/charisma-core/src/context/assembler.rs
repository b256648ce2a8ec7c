//! Context assembler for conversational turns.
//!
//! Reads history, relationship state, and character configuration in one
//! pass and produces a `ContextSnapshot` for the prompt builder.

use std::collections::BTreeMap;

use charisma_types::context::ContextSnapshot;
use charisma_types::error::RepositoryError;
use charisma_types::llm::ChatTurnMessage;
use charisma_types::session::{ChatMessage, ChatSession};
use charisma_types::user::User;
use uuid::Uuid;

use crate::repository::{CharacterRepository, MessageRepository, RelationRepository};

/// Assembles the model-facing context for one turn.
///
/// Generic over repository traits so tests can run it against in-memory
/// mocks.
pub struct ContextAssembler<C, M, R> {
    characters: C,
    messages: M,
    relations: R,
    history_limit: i64,
}

impl<C, M, R> ContextAssembler<C, M, R>
where
    C: CharacterRepository,
    M: MessageRepository,
    R: RelationRepository,
{
    pub fn new(characters: C, messages: M, relations: R, history_limit: usize) -> Self {
        Self {
            characters,
            messages,
            relations,
            history_limit: history_limit as i64,
        }
    }

    /// Build the context snapshot for a session.
    ///
    /// The user is the speaker: their messages in history are tagged with
    /// `"{display_name}<{platform_user_id}>"` on a line of their own so
    /// the model can tell speakers apart across sessions in shared
    /// channels. Missing memory and affinity rows fall back to an empty
    /// summary and the neutral default score.
    pub async fn assemble(
        &self,
        session: &ChatSession,
        user: &User,
    ) -> Result<ContextSnapshot, RepositoryError> {
        let character = self
            .characters
            .get(&session.character_id)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        // Newest-first from storage; the prompt wants oldest-first.
        let mut recent = self.messages.recent(&session.id, self.history_limit).await?;
        recent.reverse();
        let history = recent
            .into_iter()
            .map(|message| to_turn_message(message, user))
            .collect();

        let memory = self
            .relations
            .memory(&session.user_id, &session.character_id)
            .await?
            .map(|m| m.summary)
            .unwrap_or_default();

        let affinity = self
            .relations
            .affinity(&session.user_id, &session.character_id)
            .await?
            .unwrap_or_default();

        let overrides = self
            .merged_customizations(&session.character_id, &session.user_id)
            .await?;

        Ok(ContextSnapshot {
            session_id: session.id,
            user_id: session.user_id,
            character_id: session.character_id,
            history,
            memory,
            affinity,
            character_settings: character.settings,
            overrides,
        })
    }

    /// Merge customization rows into one attribute map.
    ///
    /// Rows arrive base-first, so inserting in order makes user-specific
    /// values overwrite base values for the same attribute.
    async fn merged_customizations(
        &self,
        character_id: &Uuid,
        user_id: &Uuid,
    ) -> Result<BTreeMap<String, String>, RepositoryError> {
        let rows = self
            .characters
            .list_customizations(character_id, Some(user_id))
            .await?;

        let mut merged = BTreeMap::new();
        for row in rows {
            merged.insert(row.attribute, row.value);
        }
        Ok(merged)
    }
}

fn to_turn_message(message: ChatMessage, user: &User) -> ChatTurnMessage {
    match message.author_id {
        Some(_) => ChatTurnMessage::user(format!(
            "{}<{}>\n{}",
            user.display_name, user.platform_user_id, message.content
        )),
        None => ChatTurnMessage::assistant(message.content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::{CharacterRepository, MessageRepository, RelationRepository};
    use charisma_types::character::{Character, CharacterRef, Customization, Interaction};
    use charisma_types::llm::MessageRole;
    use charisma_types::relation::{Affinity, Memory};
    use chrono::Utc;
    use std::sync::Mutex;

    struct FakeCharacters {
        character: Character,
        customizations: Vec<Customization>,
    }

    impl CharacterRepository for FakeCharacters {
        async fn get(&self, character_id: &Uuid) -> Result<Option<Character>, RepositoryError> {
            Ok((*character_id == self.character.id).then(|| self.character.clone()))
        }

        async fn list_created_by(
            &self,
            _creator_id: &Uuid,
        ) -> Result<Vec<Character>, RepositoryError> {
            Ok(vec![])
        }

        async fn list_customizations(
            &self,
            character_id: &Uuid,
            user_id: Option<&Uuid>,
        ) -> Result<Vec<Customization>, RepositoryError> {
            Ok(self
                .customizations
                .iter()
                .filter(|c| {
                    c.character_id == *character_id
                        && (c.user_id.is_none() || c.user_id.as_ref() == user_id)
                })
                .cloned()
                .collect())
        }

        async fn record_interaction(
            &self,
            _interaction: &Interaction,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn interaction_history(
            &self,
            _user_id: &Uuid,
        ) -> Result<Vec<CharacterRef>, RepositoryError> {
            Ok(vec![])
        }
    }

    struct FakeMessages {
        // Newest first, as the real repository returns them.
        newest_first: Mutex<Vec<ChatMessage>>,
    }

    impl MessageRepository for FakeMessages {
        async fn append(&self, message: &ChatMessage) -> Result<(), RepositoryError> {
            self.newest_first.lock().unwrap().insert(0, message.clone());
            Ok(())
        }

        async fn recent(
            &self,
            _session_id: &Uuid,
            limit: i64,
        ) -> Result<Vec<ChatMessage>, RepositoryError> {
            let messages = self.newest_first.lock().unwrap();
            Ok(messages.iter().take(limit as usize).cloned().collect())
        }
    }

    struct FakeRelations {
        memory: Option<Memory>,
        affinity: Option<Affinity>,
    }

    impl RelationRepository for FakeRelations {
        async fn memory(
            &self,
            _user_id: &Uuid,
            _character_id: &Uuid,
        ) -> Result<Option<Memory>, RepositoryError> {
            Ok(self.memory.clone())
        }

        async fn affinity(
            &self,
            _user_id: &Uuid,
            _character_id: &Uuid,
        ) -> Result<Option<Affinity>, RepositoryError> {
            Ok(self.affinity)
        }

        async fn upsert_memory(
            &self,
            _user_id: &Uuid,
            _character_id: &Uuid,
            _summary: &str,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn upsert_affinity(
            &self,
            _user_id: &Uuid,
            _character_id: &Uuid,
            _value: Affinity,
        ) -> Result<(), RepositoryError> {
            Ok(())
        }
    }

    fn fixture() -> (ChatSession, User, Character) {
        let user = User::provision("discord-42", "Ada");
        let character = Character {
            id: Uuid::now_v7(),
            name: "Aria".to_string(),
            description: "A bard".to_string(),
            creator_id: user.id,
            settings: "You are Aria.".to_string(),
            created_at: Utc::now(),
        };
        let session = ChatSession::open(user.id, character.id);
        (session, user, character)
    }

    #[tokio::test]
    async fn test_history_ordered_and_tagged() {
        let (session, user, character) = fixture();
        let messages = FakeMessages {
            newest_first: Mutex::new(vec![]),
        };
        messages
            .append(&ChatMessage::from_user(session.id, user.id, "hello"))
            .await
            .unwrap();
        messages
            .append(&ChatMessage::from_character(session.id, "hi Ada"))
            .await
            .unwrap();

        let assembler = ContextAssembler::new(
            FakeCharacters {
                character,
                customizations: vec![],
            },
            messages,
            FakeRelations {
                memory: None,
                affinity: None,
            },
            100,
        );

        let snapshot = assembler.assemble(&session, &user).await.unwrap();
        assert_eq!(snapshot.history.len(), 2);
        // Oldest first: the user message precedes the character's reply.
        assert_eq!(snapshot.history[0].role, MessageRole::User);
        assert_eq!(snapshot.history[0].content, "Ada<discord-42>\nhello");
        assert_eq!(snapshot.history[1].role, MessageRole::Assistant);
        assert_eq!(snapshot.history[1].content, "hi Ada");
    }

    #[tokio::test]
    async fn test_history_capped_at_limit() {
        let (session, user, character) = fixture();
        let messages = FakeMessages {
            newest_first: Mutex::new(vec![]),
        };
        for i in 0..10 {
            messages
                .append(&ChatMessage::from_user(session.id, user.id, &format!("m{i}")))
                .await
                .unwrap();
        }

        let assembler = ContextAssembler::new(
            FakeCharacters {
                character,
                customizations: vec![],
            },
            messages,
            FakeRelations {
                memory: None,
                affinity: None,
            },
            3,
        );

        let snapshot = assembler.assemble(&session, &user).await.unwrap();
        assert_eq!(snapshot.history.len(), 3);
        // The cap keeps the newest messages, oldest of the three first.
        assert!(snapshot.history[0].content.ends_with("m7"));
        assert!(snapshot.history[2].content.ends_with("m9"));
    }

    #[tokio::test]
    async fn test_defaults_for_fresh_pair() {
        let (session, user, character) = fixture();
        let assembler = ContextAssembler::new(
            FakeCharacters {
                character,
                customizations: vec![],
            },
            FakeMessages {
                newest_first: Mutex::new(vec![]),
            },
            FakeRelations {
                memory: None,
                affinity: None,
            },
            100,
        );

        let snapshot = assembler.assemble(&session, &user).await.unwrap();
        assert_eq!(snapshot.memory, "");
        assert_eq!(snapshot.affinity.value(), 50);
        assert!(snapshot.history.is_empty());
    }

    #[tokio::test]
    async fn test_user_customizations_override_base() {
        let (session, user, character) = fixture();
        let character_id = character.id;
        let customizations = vec![
            Customization {
                id: Uuid::now_v7(),
                character_id,
                user_id: None,
                attribute: "mood".to_string(),
                value: "sunny".to_string(),
            },
            Customization {
                id: Uuid::now_v7(),
                character_id,
                user_id: None,
                attribute: "greeting".to_string(),
                value: "hello".to_string(),
            },
            Customization {
                id: Uuid::now_v7(),
                character_id,
                user_id: Some(user.id),
                attribute: "mood".to_string(),
                value: "grumpy".to_string(),
            },
        ];

        let assembler = ContextAssembler::new(
            FakeCharacters {
                character,
                customizations,
            },
            FakeMessages {
                newest_first: Mutex::new(vec![]),
            },
            FakeRelations {
                memory: None,
                affinity: None,
            },
            100,
        );

        let snapshot = assembler.assemble(&session, &user).await.unwrap();
        assert_eq!(snapshot.overrides.get("mood").map(String::as_str), Some("grumpy"));
        assert_eq!(snapshot.overrides.get("greeting").map(String::as_str), Some("hello"));
    }
}
