//! Maps internal error types onto `tonic::Status` codes.
//!
//! Each arm picks the status code a client is expected to branch on:
//! `INVALID_ARGUMENT` for malformed input, `NOT_FOUND` for unknown
//! workflows/executions/tasks, `FAILED_PRECONDITION` for a lease that's no
//! longer held, `DATA_LOSS` for a blob integrity failure.

use tonic::Status;

pub fn engine_error_to_status(err: engine::EngineError) -> Status {
    use engine::EngineError as E;

    match err {
        E::InvalidIr(e) => Status::invalid_argument(e.to_string()),
        E::UnknownWorkflowVersion { workflow_id, version_hash } => Status::not_found(format!(
            "unknown workflow version: {workflow_id}@{version_hash}"
        )),
        E::UnknownExecution(id) => Status::not_found(format!("unknown execution: {id}")),
        E::Queue(queue::QueueError::NotLeased(id)) => {
            Status::failed_precondition(format!("task '{id}' is not currently leased"))
        }
        E::Queue(queue::QueueError::TaskNotFound(id)) => {
            Status::not_found(format!("task '{id}' not found"))
        }
        E::Queue(queue::QueueError::Database(db_err)) => db_error_to_status(db_err),
        E::Database(db_err) => db_error_to_status(db_err),
    }
}

fn db_error_to_status(err: db::DbError) -> Status {
    use db::DbError as D;

    match err {
        D::NotFound => Status::not_found("not found"),
        D::BlobIntegrity { expected, actual } => Status::data_loss(format!(
            "blob integrity check failed: expected sha256 {expected}, got {actual}"
        )),
        D::BlobIo(e) => Status::internal(e.to_string()),
        D::Sqlx(e) => Status::internal(e.to_string()),
        D::Migration(e) => Status::internal(e.to_string()),
    }
}
