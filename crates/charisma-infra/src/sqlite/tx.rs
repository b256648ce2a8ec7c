//! Write-transaction combinator.
//!
//! The writer pool holds a single connection, so wrapping a sequence of
//! statements in one transaction both serializes it against other writes
//! and makes it atomic: commit on success, roll back on any error.

use charisma_types::error::RepositoryError;
use futures_util::future::BoxFuture;
use sqlx::SqliteConnection;

use super::map_sqlx_err;
use super::pool::DatabasePool;

/// Run `op` inside a transaction on the writer pool.
///
/// The operation receives the transaction's connection; every statement
/// it issues is committed together or not at all.
pub async fn with_write_tx<R, F>(pool: &DatabasePool, op: F) -> Result<R, RepositoryError>
where
    F: for<'c> FnOnce(&'c mut SqliteConnection) -> BoxFuture<'c, Result<R, RepositoryError>>
        + Send,
    R: Send,
{
    let mut tx = pool.writer.begin().await.map_err(map_sqlx_err)?;

    match op(&mut tx).await {
        Ok(value) => {
            tx.commit().await.map_err(map_sqlx_err)?;
            Ok(value)
        }
        Err(err) => {
            // Rollback failure is secondary; the original error wins.
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}
