//! Engine-level error types.

use thiserror::Error;
use uuid::Uuid;

/// Errors produced by workflow registration, execution lifecycle, and
/// scheduling.
#[derive(Debug, Error)]
pub enum EngineError {
    // ------ Validation errors (RegisterWorkflow, INVALID_ARGUMENT) ------
    /// `ir_json` failed to parse or validate.
    #[error("invalid workflow IR: {0}")]
    InvalidIr(#[from] nodes::IrError),

    // ------ Lookup errors (NOT_FOUND) ------
    /// `StartExecution` referenced a `(workflow_id, version_hash)` that was
    /// never registered.
    #[error("unknown workflow version: {workflow_id}@{version_hash}")]
    UnknownWorkflowVersion {
        workflow_id: String,
        version_hash: String,
    },

    /// `GetStatus` referenced an execution that doesn't exist.
    #[error("unknown execution: {0}")]
    UnknownExecution(Uuid),

    // ------ Persistence ------
    /// Persistence error from the `db` crate.
    #[error("database error: {0}")]
    Database(#[from] db::DbError),

    /// Lease/claim coordination error from the `queue` crate.
    #[error("queue error: {0}")]
    Queue(#[from] queue::QueueError),
}
