//! Lease/claim/backoff coordination over `task_queue`.
//!
//! This crate owns the *mechanics* of the claim protocol (atomic claim,
//! retry-or-terminal) but not retry *policy* — callers (`engine`) supply
//! the node's `NodeType` so the attempt/backoff decision stays keyed off
//! `nodes::retry`, the single source of truth for it. Completion itself
//! has no standalone mechanics worth a wrapper: `engine::tasks::complete_task`
//! calls `db::repository::task_queue::mark_done` directly because it must
//! run in the same transaction as `set_completed_node`.

use chrono::{Duration as ChronoDuration, Utc};
use db::models::TaskQueueRow;
use db::DbPool;
use nodes::types::NodeType;
use tracing::{info, warn};
use uuid::Uuid;

use crate::QueueError;

/// Default worker lease TTL — a claimed task not completed or renewed
/// within this window is eligible for the sweeper to reclaim.
pub const DEFAULT_LEASE_TTL_SECS: i64 = 30;

/// Outcome of a `FailTask` call (or an equivalent sweeper-driven retry).
#[derive(Debug, Clone)]
pub enum FailOutcome {
    /// The task was put back on the queue for another attempt.
    Retrying { task_id: Uuid, next_attempt: u32 },
    /// Retries are exhausted (or the node type is non-retriable); the task
    /// is terminally `FAILED`. The caller must fail the whole execution.
    Terminal { task_id: Uuid },
}

/// Atomically claim the oldest claimable task for `version_hash`.
pub async fn poll(
    pool: &DbPool,
    worker_id: &str,
    version_hash: &str,
    lease_ttl_secs: i64,
) -> Result<Option<TaskQueueRow>, QueueError> {
    let row = db::repository::task_queue::claim_next(
        pool,
        worker_id,
        version_hash,
        ChronoDuration::seconds(lease_ttl_secs),
    )
    .await?;

    if let Some(row) = &row {
        info!(task_id = %row.task_id, node_id = %row.node_id, worker_id, "task claimed");
    }

    Ok(row)
}

/// Fail a leased task. Decides retry-vs-terminal from `node_type`'s policy
/// and the row's current `attempt`, then either reschedules it `READY`
/// with a backoff delay or marks it terminally `FAILED`.
pub async fn fail(
    pool: &DbPool,
    task_id: Uuid,
    node_type: NodeType,
    error_message: &str,
) -> Result<FailOutcome, QueueError> {
    let row = db::repository::task_queue::get_task(pool, task_id)
        .await?
        .ok_or(QueueError::TaskNotFound(task_id))?;

    let current_attempt = row.attempt as u32;
    let max_attempts = nodes::retry::max_attempts(node_type);

    if current_attempt < max_attempts {
        let next_attempt = current_attempt + 1;
        let delay = nodes::retry::backoff(next_attempt);
        let not_before_at = Utc::now()
            + ChronoDuration::from_std(delay).unwrap_or_else(|_| ChronoDuration::seconds(30));

        let rescheduled = db::repository::task_queue::reschedule_retry(
            pool,
            task_id,
            next_attempt as i32,
            not_before_at,
        )
        .await?
        .ok_or(QueueError::NotLeased(task_id))?;

        warn!(
            task_id = %rescheduled.task_id, node_id = %rescheduled.node_id,
            attempt = next_attempt, delay_secs = delay.as_secs(), error_message,
            "task failed, retrying"
        );

        Ok(FailOutcome::Retrying {
            task_id: rescheduled.task_id,
            next_attempt,
        })
    } else {
        let terminal = db::repository::task_queue::mark_failed_terminal(pool, task_id)
            .await?
            .ok_or(QueueError::NotLeased(task_id))?;

        warn!(
            task_id = %terminal.task_id, node_id = %terminal.node_id,
            attempt = current_attempt, error_message,
            "task failed terminally, retries exhausted"
        );

        Ok(FailOutcome::Terminal {
            task_id: terminal.task_id,
        })
    }
}
