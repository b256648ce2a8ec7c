//! SQLite user repository implementation.
//!
//! Implements `UserRepository` from `charisma-core` using sqlx with
//! split read/write pools: raw queries, private Row structs, writes on
//! the writer pool.

use charisma_core::repository::UserRepository;
use charisma_types::error::RepositoryError;
use charisma_types::user::{PointTransaction, User};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;
use super::{format_datetime, map_sqlx_err, parse_datetime};

/// SQLite-backed implementation of `UserRepository`.
#[derive(Clone)]
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct UserRow {
    id: String,
    platform_user_id: String,
    display_name: String,
    points_balance: i64,
    current_character_id: Option<String>,
    created_at: String,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            platform_user_id: row.try_get("platform_user_id")?,
            display_name: row.try_get("display_name")?,
            points_balance: row.try_get("points_balance")?,
            current_character_id: row.try_get("current_character_id")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let current_character_id = self
            .current_character_id
            .as_deref()
            .map(Uuid::parse_str)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid current_character_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(User {
            id,
            platform_user_id: self.platform_user_id,
            display_name: self.display_name,
            points_balance: self.points_balance,
            current_character_id,
            created_at,
        })
    }
}

struct PointTransactionRow {
    id: String,
    sender_id: String,
    receiver_id: String,
    amount: i64,
    created_at: String,
}

impl PointTransactionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sender_id: row.try_get("sender_id")?,
            receiver_id: row.try_get("receiver_id")?,
            amount: row.try_get("amount")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_transaction(self) -> Result<PointTransaction, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid transaction id: {e}")))?;
        let sender_id = Uuid::parse_str(&self.sender_id)
            .map_err(|e| RepositoryError::Query(format!("invalid sender_id: {e}")))?;
        let receiver_id = Uuid::parse_str(&self.receiver_id)
            .map_err(|e| RepositoryError::Query(format!("invalid receiver_id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(PointTransaction {
            id,
            sender_id,
            receiver_id,
            amount: self.amount,
            created_at,
        })
    }
}

// ---------------------------------------------------------------------------
// UserRepository implementation
// ---------------------------------------------------------------------------

impl UserRepository for SqliteUserRepository {
    async fn find_by_platform_id(
        &self,
        platform_user_id: &str,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE platform_user_id = ?")
            .bind(platform_user_id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let user_row = UserRow::from_row(&row).map_err(map_sqlx_err)?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    async fn get(&self, user_id: &Uuid) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_err)?;

        match row {
            Some(row) => {
                let user_row = UserRow::from_row(&row).map_err(map_sqlx_err)?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, user: &User) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"INSERT INTO users (id, platform_user_id, display_name, points_balance, current_character_id, created_at)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(user.id.to_string())
        .bind(&user.platform_user_id)
        .bind(&user.display_name)
        .bind(user.points_balance)
        .bind(user.current_character_id.map(|id| id.to_string()))
        .bind(format_datetime(&user.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if e.as_database_error().is_some_and(|d| d.is_unique_violation()) => {
                Err(RepositoryError::Conflict(format!(
                    "platform id '{}' already registered",
                    user.platform_user_id
                )))
            }
            Err(e) => Err(map_sqlx_err(e)),
        }
    }

    async fn set_current_character(
        &self,
        user_id: &Uuid,
        character_id: Option<&Uuid>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET current_character_id = ? WHERE id = ?")
            .bind(character_id.map(|id| id.to_string()))
            .bind(user_id.to_string())
            .execute(&self.pool.writer)
            .await
            .map_err(map_sqlx_err)?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn points_balance(&self, user_id: &Uuid) -> Result<i64, RepositoryError> {
        let row: Option<(i64,)> = sqlx::query_as("SELECT points_balance FROM users WHERE id = ?")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(map_sqlx_err)?;

        row.map(|(balance,)| balance).ok_or(RepositoryError::NotFound)
    }

    async fn points_history(
        &self,
        user_id: &Uuid,
        limit: i64,
    ) -> Result<Vec<PointTransaction>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT * FROM point_transactions
               WHERE sender_id = ? OR receiver_id = ?
               ORDER BY created_at DESC, id DESC
               LIMIT ?"#,
        )
        .bind(user_id.to_string())
        .bind(user_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(map_sqlx_err)?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in &rows {
            let tx_row = PointTransactionRow::from_row(row).map_err(map_sqlx_err)?;
            transactions.push(tx_row.into_transaction()?);
        }

        Ok(transactions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use charisma_types::config::DatabaseConfig;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig::with_path(dir.path().join("test.db"));
        // Leak tempdir so it lives for the test
        std::mem::forget(dir);
        DatabasePool::connect(&config).await.unwrap()
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = User::provision("discord-42", "Ada");

        repo.create(&user).await.unwrap();

        let found = repo.find_by_platform_id("discord-42").await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.display_name, "Ada");
        assert_eq!(found.points_balance, 0);
        assert!(found.current_character_id.is_none());

        let by_id = repo.get(&user.id).await.unwrap().unwrap();
        assert_eq!(by_id.platform_user_id, "discord-42");
    }

    #[tokio::test]
    async fn test_duplicate_platform_id_conflicts() {
        let repo = SqliteUserRepository::new(test_pool().await);
        repo.create(&User::provision("discord-42", "Ada")).await.unwrap();

        let err = repo
            .create(&User::provision("discord-42", "Imposter"))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_set_current_character_unknown_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let err = repo
            .set_current_character(&Uuid::now_v7(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_points_balance_unknown_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let err = repo.points_balance(&Uuid::now_v7()).await.unwrap_err();
        assert!(matches!(err, RepositoryError::NotFound));
    }

    #[tokio::test]
    async fn test_points_history_both_directions() {
        let pool = test_pool().await;
        let repo = SqliteUserRepository::new(pool.clone());
        let ada = User::provision("discord-1", "Ada");
        let ben = User::provision("discord-2", "Ben");
        repo.create(&ada).await.unwrap();
        repo.create(&ben).await.unwrap();

        for (sender, receiver, amount, ts) in [
            (&ada, &ben, 10, "2026-01-01T00:00:00Z"),
            (&ben, &ada, 5, "2026-01-02T00:00:00Z"),
        ] {
            sqlx::query(
                "INSERT INTO point_transactions (id, sender_id, receiver_id, amount, created_at)
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(Uuid::now_v7().to_string())
            .bind(sender.id.to_string())
            .bind(receiver.id.to_string())
            .bind(amount)
            .bind(ts)
            .execute(&pool.writer)
            .await
            .unwrap();
        }

        let history = repo.points_history(&ada.id, 10).await.unwrap();
        assert_eq!(history.len(), 2);
        // Newest first.
        assert_eq!(history[0].amount, 5);
        assert_eq!(history[1].amount, 10);
    }
}
