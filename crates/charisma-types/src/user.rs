//! User account types.
//!
//! A user is created on first contact from the chat platform and never
//! deleted. The platform id is the external identity; the internal id is a
//! UUIDv7 used everywhere else.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered (or auto-provisioned) user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    /// Unique id assigned by the chat platform (e.g., a Discord snowflake).
    pub platform_user_id: String,
    pub display_name: String,
    pub points_balance: i64,
    /// Character the user is currently talking to, if any.
    pub current_character_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user record for first contact.
    ///
    /// Auto-provisioned users get whatever display name the platform
    /// supplied; there is no explicit registration step required.
    pub fn provision(platform_user_id: &str, display_name: &str) -> Self {
        Self {
            id: Uuid::now_v7(),
            platform_user_id: platform_user_id.to_string(),
            display_name: display_name.to_string(),
            points_balance: 0,
            current_character_id: None,
            created_at: Utc::now(),
        }
    }
}

/// A single entry in a user's points history.
///
/// Transfers themselves are written elsewhere; this type only reads back
/// the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTransaction {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provision_defaults() {
        let user = User::provision("discord-123", "Ada");
        assert_eq!(user.platform_user_id, "discord-123");
        assert_eq!(user.display_name, "Ada");
        assert_eq!(user.points_balance, 0);
        assert!(user.current_character_id.is_none());
    }

    #[test]
    fn test_user_serde_roundtrip() {
        let user = User::provision("discord-123", "Ada");
        let json = serde_json::to_string(&user).unwrap();
        let parsed: User = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, user.id);
        assert_eq!(parsed.display_name, "Ada");
    }
}
