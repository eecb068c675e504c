//! Queue-level error types.

use thiserror::Error;

/// Errors produced by the lease/claim/backoff coordination layer.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Persistence error from the `db` crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// `CompleteTask`/`FailTask` referenced a task that isn't currently
    /// `LEASED` — the lease expired and the sweeper (or a retry) already
    /// reclaimed it.
    #[error("task '{0}' is not currently leased")]
    NotLeased(uuid::Uuid),

    /// `CompleteTask`/`FailTask`/`PollTask` referenced a task that doesn't exist.
    #[error("task '{0}' not found")]
    TaskNotFound(uuid::Uuid),
}
