//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod character;
pub mod message;
pub mod pool;
pub mod relation;
pub mod session;
pub mod tx;
pub mod user;

use charisma_types::error::RepositoryError;
use chrono::{DateTime, Utc};

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

/// Format a timestamp for storage.
pub(crate) fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Map an sqlx error onto the repository error taxonomy.
///
/// Pool exhaustion and transport failures are connection errors; the
/// rest surface as query errors with their message preserved.
pub(crate) fn map_sqlx_err(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::Connection
        }
        other => RepositoryError::Query(other.to_string()),
    }
}
