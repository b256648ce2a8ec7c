//! Per-pair relationship state: memory summaries and affinity scores.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Neutral starting affinity for a pair with no recorded history.
pub const DEFAULT_AFFINITY: i64 = 50;

/// An affinity score, always within `[0, 100]`.
///
/// Construction clamps rather than rejects: model-proposed adjustments
/// that would leave the range saturate at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Affinity(i64);

impl Affinity {
    pub fn clamped(value: i64) -> Self {
        Self(value.clamp(0, 100))
    }

    pub fn value(&self) -> i64 {
        self.0
    }

    /// Parse a model-provided affinity string.
    ///
    /// Non-numeric input falls back to the neutral default instead of
    /// failing the whole turn.
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(value) => Self::clamped(value),
            Err(_) => Self::default(),
        }
    }
}

impl Default for Affinity {
    fn default() -> Self {
        Self(DEFAULT_AFFINITY)
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The rolling memory summary a character keeps about a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    pub user_id: Uuid,
    pub character_id: Uuid,
    pub summary: String,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped_bounds() {
        assert_eq!(Affinity::clamped(-5).value(), 0);
        assert_eq!(Affinity::clamped(0).value(), 0);
        assert_eq!(Affinity::clamped(73).value(), 73);
        assert_eq!(Affinity::clamped(150).value(), 100);
    }

    #[test]
    fn test_parse_lenient() {
        assert_eq!(Affinity::parse_lenient("80").value(), 80);
        assert_eq!(Affinity::parse_lenient(" 42 ").value(), 42);
        assert_eq!(Affinity::parse_lenient("999").value(), 100);
        assert_eq!(Affinity::parse_lenient("very high").value(), DEFAULT_AFFINITY);
        assert_eq!(Affinity::parse_lenient("").value(), DEFAULT_AFFINITY);
    }

    #[test]
    fn test_default_is_neutral() {
        assert_eq!(Affinity::default().value(), 50);
    }
}
