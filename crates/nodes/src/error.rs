//! Error types for IR parsing/validation.

use thiserror::Error;

/// Errors raised while parsing or validating an `ir_json` document.
///
/// Surfaced by `RegisterWorkflow` as `INVALID_ARGUMENT`.
#[derive(Debug, Error)]
pub enum IrError {
    #[error("malformed ir_json: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("node '{node_id}' has unknown type '{node_type}'")]
    UnknownNodeType { node_id: String, node_type: String },

    #[error("node '{node_id}' depends on unknown node '{dependency_id}'")]
    UnknownNodeReference {
        node_id: String,
        dependency_id: String,
    },

    #[error("workflow graph contains a cycle")]
    CycleDetected,

    #[error("TIMER node '{0}' is missing a positive delay_seconds")]
    MissingTimerDelay(String),
}
