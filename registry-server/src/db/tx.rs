//! Transaction scope
//!
//! Every multi-step ledger operation runs inside a [`TxScope`]. A caller that
//! already holds a connection (inside its own transaction) passes it in and
//! keeps responsibility for commit/rollback; otherwise the scope opens and
//! owns a transaction.

use shared::error::AppResult;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};

use super::repository::RepoError;

pub enum TxScope<'c> {
    Owned(Transaction<'static, Sqlite>),
    Borrowed(&'c mut SqliteConnection),
}

impl<'c> TxScope<'c> {
    /// Borrow `outer` when given, otherwise begin an immediate transaction
    pub async fn begin(
        pool: &SqlitePool,
        outer: Option<&'c mut SqliteConnection>,
    ) -> AppResult<TxScope<'c>> {
        match outer {
            Some(conn) => Ok(Self::Borrowed(conn)),
            None => {
                // Take the write lock up front so concurrent writers queue on
                // busy_timeout instead of failing a read-to-write upgrade
                let tx = pool
                    .begin_with("BEGIN IMMEDIATE")
                    .await
                    .map_err(RepoError::from)?;
                Ok(Self::Owned(tx))
            }
        }
    }

    pub fn conn(&mut self) -> &mut SqliteConnection {
        match self {
            Self::Owned(tx) => &mut **tx,
            Self::Borrowed(conn) => &mut **conn,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned(_))
    }

    /// Commit on success, roll back on error; borrowed scopes pass through
    pub async fn finish<T>(self, result: AppResult<T>) -> AppResult<T> {
        let tx = match self {
            Self::Borrowed(_) => return result,
            Self::Owned(tx) => tx,
        };

        match result {
            Ok(value) => {
                tx.commit().await.map_err(RepoError::from)?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        cause = %err,
                        "Transaction rollback failed"
                    );
                }
                Err(err)
            }
        }
    }
}
