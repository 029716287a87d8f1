//! sea-orm helpers: bounded query execution and error classification.

use std::future::Future;
use std::time::Duration;

use sea_orm::{DbErr, RuntimeErr, SqlErr, sqlx};

/// Failure of a single store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{op}: timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },
    #[error("{op}: {source}")]
    Db {
        op: &'static str,
        #[source]
        source: DbErr,
    },
}

impl StoreError {
    pub fn op(&self) -> &'static str {
        match self {
            Self::Timeout { op, .. } | Self::Db { op, .. } => op,
        }
    }

    /// The write collided with a unique index.
    pub fn is_unique_violation(&self) -> bool {
        match self {
            Self::Db { source, .. } => {
                matches!(source.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
            }
            Self::Timeout { .. } => false,
        }
    }

    /// The store could not be reached in time; the caller may retry later.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Db { source, .. } => match source {
                DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => true,
                // A connection dropped or the pool gave up mid-statement.
                DbErr::Exec(RuntimeErr::SqlxError(e))
                | DbErr::Query(RuntimeErr::SqlxError(e)) => matches!(
                    e,
                    sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
                ),
                _ => false,
            },
        }
    }
}

/// Run a store future under a deadline.
///
/// Elapsed deadlines are not retried here; the caller owns retry policy.
pub async fn with_timeout<T, F>(
    timeout: Duration,
    op: &'static str,
    fut: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, DbErr>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result.map_err(|source| StoreError::Db { op, source }),
        Err(_) => Err(StoreError::Timeout { op, timeout }),
    }
}
