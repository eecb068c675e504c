//! `PollTask` / `CompleteTask` / `FailTask` orchestration.
//!
//! Bridges the `queue` crate's lease mechanics to the scheduler: every
//! completion or terminal failure is followed by `Scheduler::advance` so
//! downstream nodes become ready (or the execution reaches a terminal
//! status) in the same request.

use db::models::TaskQueueRow;
use db::{repository, BlobStore, DbPool};
use nodes::types::NodeType;
use tracing::{info, warn};
use uuid::Uuid;

use crate::scheduler::Scheduler;
use crate::EngineError;

/// Claim the oldest claimable task for `version_hash`.
pub async fn poll_task(
    pool: &DbPool,
    worker_id: &str,
    version_hash: &str,
    lease_ttl_secs: i64,
) -> Result<Option<TaskQueueRow>, EngineError> {
    queue::poll(pool, worker_id, version_hash, lease_ttl_secs)
        .await
        .map_err(Into::into)
}

/// Complete a leased task with a worker-produced output.
///
/// `output_bytes` larger than `inline_threshold_bytes` are written to the
/// blob sidecar and replaced with a claim-check pointer before being
/// committed to `task_queue.output_json` / `executions.completed_nodes_json`.
pub async fn complete_task(
    pool: &DbPool,
    blobs: &BlobStore,
    scheduler: &Scheduler,
    task_id: Uuid,
    output_bytes: &[u8],
    inline_threshold_bytes: u64,
) -> Result<(), EngineError> {
    let task = repository::task_queue::get_task(pool, task_id)
        .await?
        .ok_or(queue::QueueError::TaskNotFound(task_id))?;

    let output_json = if output_bytes.len() as u64 > inline_threshold_bytes {
        let pointer = blobs.store(output_bytes).await.map_err(db::DbError::from)?;
        serde_json::to_string(&pointer).expect("ClaimCheck always serialises")
    } else {
        String::from_utf8_lossy(output_bytes).into_owned()
    };

    let mut tx = pool.begin().await.map_err(db::DbError::from)?;

    repository::task_queue::mark_done(&mut *tx, task_id, &output_json)
        .await?
        .ok_or(queue::QueueError::NotLeased(task_id))?;

    repository::executions::set_completed_node(&mut *tx, task.execution_id, &task.node_id, &output_json)
        .await?;

    tx.commit().await.map_err(db::DbError::from)?;

    info!(task_id = %task_id, node_id = %task.node_id, "task completed");
    scheduler.advance(task.execution_id).await
}

/// Fail a leased task. Retries or terminates per `nodes::retry` policy,
/// then re-runs the scheduler if the execution needs to move to `FAILED`.
pub async fn fail_task(
    pool: &DbPool,
    scheduler: &Scheduler,
    task_id: Uuid,
    error_message: &str,
) -> Result<(), EngineError> {
    let task = repository::task_queue::get_task(pool, task_id)
        .await?
        .ok_or(queue::QueueError::TaskNotFound(task_id))?;

    let node_type = resolve_node_type(pool, &task).await?;
    let outcome = queue::fail(pool, task_id, node_type, error_message).await?;

    if let queue::FailOutcome::Terminal { .. } = outcome {
        warn!(task_id = %task_id, node_id = %task.node_id, error_message, "task exhausted retries");
        scheduler.advance(task.execution_id).await?;
    }

    Ok(())
}

/// Look up the node type a `task_queue` row belongs to, via its execution's
/// pinned workflow version. Shared by `fail_task` and the lease sweeper.
pub(crate) async fn resolve_node_type(
    pool: &DbPool,
    task: &TaskQueueRow,
) -> Result<NodeType, EngineError> {
    let execution = repository::executions::get_execution(pool, task.execution_id)
        .await?
        .ok_or(EngineError::UnknownExecution(task.execution_id))?;

    let version = repository::workflow_versions::get_version(pool, &execution.workflow_id, &task.version_hash)
        .await?
        .ok_or_else(|| EngineError::UnknownWorkflowVersion {
            workflow_id: execution.workflow_id.clone(),
            version_hash: task.version_hash.clone(),
        })?;

    let ir = nodes::parse_ir(&version.ir_json)?;
    let spec = ir
        .get(&task.node_id)
        .expect("a persisted task_queue row always references a node in its pinned IR");

    Ok(spec.node_type)
}
