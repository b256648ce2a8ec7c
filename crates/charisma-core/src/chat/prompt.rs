//! Prompt construction for conversational turns.
//!
//! Three system blocks precede the history: the character's settings,
//! the user's overrides (which win on conflict), and the state-update
//! instructions carrying current memory and affinity.

use charisma_types::context::ContextSnapshot;
use charisma_types::llm::{ChatTurnMessage, ChatTurnRequest};

/// Build the full model request for one turn.
///
/// History in the snapshot is already ordered oldest-first and capped;
/// this only prepends the system blocks.
pub fn build_turn_request(
    snapshot: &ContextSnapshot,
    model: &str,
    max_tokens: u32,
) -> ChatTurnRequest {
    let mut messages = Vec::with_capacity(snapshot.history.len() + 3);
    messages.push(ChatTurnMessage::system(character_block(snapshot)));
    messages.push(ChatTurnMessage::system(overrides_block(snapshot)));
    messages.push(ChatTurnMessage::system(state_block(snapshot)));
    messages.extend(snapshot.history.iter().cloned());

    ChatTurnRequest {
        model: model.to_string(),
        messages,
        max_tokens,
    }
}

fn character_block(snapshot: &ContextSnapshot) -> String {
    format!(
        "You are a role-playing chatbot, playing a character in a role-playing game.\n\
         The following are the character settings for the role you are playing. \
         Use them to shape your responses to the user.\n\
         {}",
        snapshot.character_settings
    )
}

fn overrides_block(snapshot: &ContextSnapshot) -> String {
    let mut rendered = String::new();
    for (attribute, value) in &snapshot.overrides {
        rendered.push_str(attribute);
        rendered.push_str(": ");
        rendered.push_str(value);
        rendered.push('\n');
    }

    format!(
        "The following are the user's character settings. Use them to shape \
         your responses to the user.\n\
         If they conflict with your own character settings, the user's \
         character settings take priority.\n\
         {rendered}"
    )
}

fn state_block(snapshot: &ContextSnapshot) -> String {
    format!(
        "Each time you reply, you can update your `memory` and `affinity` for \
         the user through the actions field, keyed by the user's id.\n\
         Use the memory action to build and keep impressions of different \
         users, and the affinity action to track how much you like \
         interacting with each user.\n\
         Affinity is an integer in [0, 100], with 50 being neutral. Adjust it \
         according to the user's interactions with you, and change your \
         attitude toward that user accordingly.\n\
         When updating these fields, use only the user's id, never their name.\n\
         \n\
         The following is the summary of your long-term memory with the user. \
         Use it to shape your responses.\n\
         {}\n\
         \n\
         The following is your current affinity for the user. Use it to shape \
         your responses.\n\
         {}",
        snapshot.memory, snapshot.affinity
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_types::llm::MessageRole;
    use charisma_types::relation::Affinity;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn snapshot() -> ContextSnapshot {
        let mut overrides = BTreeMap::new();
        overrides.insert("mood".to_string(), "grumpy".to_string());
        ContextSnapshot {
            session_id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            character_id: Uuid::now_v7(),
            history: vec![ChatTurnMessage::user("Ada<discord-42>\nhello")],
            memory: "Ada likes tea.".to_string(),
            affinity: Affinity::clamped(72),
            character_settings: "You are Aria, a bard.".to_string(),
            overrides,
        }
    }

    #[test]
    fn test_system_blocks_precede_history() {
        let request = build_turn_request(&snapshot(), "gpt-4o-mini", 1024);
        assert_eq!(request.model, "gpt-4o-mini");
        assert_eq!(request.messages.len(), 4);
        for message in &request.messages[..3] {
            assert_eq!(message.role, MessageRole::System);
        }
        assert_eq!(request.messages[3].role, MessageRole::User);
    }

    #[test]
    fn test_blocks_carry_state() {
        let request = build_turn_request(&snapshot(), "gpt-4o-mini", 1024);
        assert!(request.messages[0].content.contains("You are Aria, a bard."));
        assert!(request.messages[1].content.contains("mood: grumpy"));
        assert!(request.messages[1].content.contains("take priority"));
        assert!(request.messages[2].content.contains("Ada likes tea."));
        assert!(request.messages[2].content.contains("72"));
    }
}
