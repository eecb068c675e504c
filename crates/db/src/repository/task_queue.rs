//! `task_queue` repository.
//!
//! This is the claim/complete/fail protocol's durable half. The claim
//! (`claim_next`) is a single `UPDATE ... FROM (SELECT ... FOR UPDATE SKIP
//! LOCKED)` statement so two concurrent `PollTask` calls can never return
//! the same `task_id`.

use chrono::{DateTime, Utc};
use sqlx::PgExecutor;
use std::collections::HashSet;
use uuid::Uuid;

use crate::{models::TaskQueueRow, DbError};

/// Insert a new `READY` queue entry. `not_before_at` is `Some` for `TIMER`
/// nodes (self-fired) and for retried attempts (backoff); `None` otherwise.
#[allow(clippy::too_many_arguments)]
pub async fn insert_ready<'e, E>(
    executor: E,
    task_id: Uuid,
    execution_id: Uuid,
    node_id: &str,
    version_hash: &str,
    attempt: i32,
    requires_worker: bool,
    not_before_at: Option<DateTime<Utc>>,
    input_json: &str,
) -> Result<TaskQueueRow, DbError>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        INSERT INTO task_queue
            (task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
             not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'READY', NULL, NULL, $5, $6, $7, $8, NULL, $9, $9)
        RETURNING task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
                  not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        "#,
        task_id,
        execution_id,
        node_id,
        version_hash,
        not_before_at,
        attempt,
        requires_worker,
        input_json,
        now,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Every `node_id` that already has at least one queue entry (of any
/// status) for this execution. A scheduler candidate with an entry here
/// has already been scheduled once and must not be re-inserted.
pub async fn node_ids_with_any_task<'e, E>(
    executor: E,
    execution_id: Uuid,
) -> Result<HashSet<String>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query!(
        r#"SELECT DISTINCT node_id FROM task_queue WHERE execution_id = $1"#,
        execution_id,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows.into_iter().map(|r| r.node_id).collect())
}

/// Atomically claim the oldest claimable `READY` task for `version_hash`.
pub async fn claim_next<'e, E>(
    executor: E,
    worker_id: &str,
    version_hash: &str,
    lease_ttl: chrono::Duration,
) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();
    let lease_expires_at = now + lease_ttl;

    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        WITH next_task AS (
            SELECT task_id
            FROM task_queue
            WHERE status = 'READY'
              AND version_hash = $1
              AND requires_worker = true
              AND (not_before_at IS NULL OR not_before_at <= $2)
            ORDER BY created_at ASC
            LIMIT 1
            FOR UPDATE SKIP LOCKED
        )
        UPDATE task_queue
        SET status = 'LEASED', lease_owner = $3, lease_expires_at = $4, updated_at = $2
        FROM next_task
        WHERE task_queue.task_id = next_task.task_id
        RETURNING task_queue.task_id, task_queue.execution_id, task_queue.node_id, task_queue.version_hash,
                  task_queue.status, task_queue.lease_owner, task_queue.lease_expires_at,
                  task_queue.not_before_at, task_queue.attempt, task_queue.requires_worker,
                  task_queue.input_json, task_queue.output_json, task_queue.created_at, task_queue.updated_at
        "#,
        version_hash,
        now,
        worker_id,
        lease_expires_at,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

pub async fn get_task<'e, E>(executor: E, task_id: Uuid) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        SELECT task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
               not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        FROM task_queue
        WHERE task_id = $1
        "#,
        task_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Transition `LEASED -> DONE`, storing the final output. Returns `None`
/// (no row matched) if the task wasn't `LEASED` — the lease expired and a
/// retry may already be in flight, which the caller treats as
/// `FAILED_PRECONDITION`.
pub async fn mark_done<'e, E>(
    executor: E,
    task_id: Uuid,
    output_json: &str,
) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        UPDATE task_queue
        SET status = 'DONE', output_json = $1, updated_at = $2
        WHERE task_id = $3 AND status = 'LEASED'
        RETURNING task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
                  not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        "#,
        output_json,
        Utc::now(),
        task_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Transition `LEASED -> FAILED` terminally (retries exhausted, or a fatal
/// node error). Returns `None` if the task wasn't `LEASED`.
pub async fn mark_failed_terminal<'e, E>(
    executor: E,
    task_id: Uuid,
) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        UPDATE task_queue
        SET status = 'FAILED', updated_at = $1
        WHERE task_id = $2 AND status = 'LEASED'
        RETURNING task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
                  not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        "#,
        Utc::now(),
        task_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Transition `LEASED -> READY` for another attempt, clearing the lease and
/// bumping `attempt`/`not_before_at`. Returns `None` if the task wasn't
/// `LEASED` (a concurrent sweeper or `CompleteTask` already resolved it).
pub async fn reschedule_retry<'e, E>(
    executor: E,
    task_id: Uuid,
    next_attempt: i32,
    not_before_at: DateTime<Utc>,
) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        UPDATE task_queue
        SET status = 'READY', attempt = $1, not_before_at = $2,
            lease_owner = NULL, lease_expires_at = NULL, updated_at = $2
        WHERE task_id = $3 AND status = 'LEASED'
        RETURNING task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
                  not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        "#,
        next_attempt,
        not_before_at,
        task_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// `LEASED` rows whose lease has expired — candidates for the sweeper.
pub async fn list_expired_leases<'e, E>(
    executor: E,
    now: DateTime<Utc>,
) -> Result<Vec<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        TaskQueueRow,
        r#"
        SELECT task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
               not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        FROM task_queue
        WHERE status = 'LEASED' AND lease_expires_at < $1
        ORDER BY lease_expires_at ASC
        "#,
        now,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

/// Transition a self-fired (`requires_worker = false`) `READY` row straight
/// to `DONE` — timers have no lease to hold. Returns `None` if the row
/// wasn't `READY` (already fired by a previous tick, which can race
/// harmlessly with the sweeper finding nothing to do).
pub async fn fire_timer<'e, E>(
    executor: E,
    task_id: Uuid,
    output_json: &str,
) -> Result<Option<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        TaskQueueRow,
        r#"
        UPDATE task_queue
        SET status = 'DONE', output_json = $1, updated_at = $2
        WHERE task_id = $3 AND status = 'READY' AND requires_worker = false
        RETURNING task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
                  not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        "#,
        output_json,
        Utc::now(),
        task_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Whether this execution has any queue entry that failed terminally
/// (retries exhausted) — the scheduler's signal to fail the whole execution.
pub async fn has_failed_terminal<'e, E>(executor: E, execution_id: Uuid) -> Result<bool, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query!(
        r#"SELECT 1 AS "one!" FROM task_queue WHERE execution_id = $1 AND status = 'FAILED' LIMIT 1"#,
        execution_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row.is_some())
}

/// Self-fired (`requires_worker = false`) `READY` rows due to fire — the
/// timer tick loop's candidate set.
pub async fn list_due_timers<'e, E>(
    executor: E,
    now: DateTime<Utc>,
) -> Result<Vec<TaskQueueRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as!(
        TaskQueueRow,
        r#"
        SELECT task_id, execution_id, node_id, version_hash, status, lease_owner, lease_expires_at,
               not_before_at, attempt, requires_worker, input_json, output_json, created_at, updated_at
        FROM task_queue
        WHERE status = 'READY' AND requires_worker = false AND not_before_at <= $1
        ORDER BY not_before_at ASC
        "#,
        now,
    )
    .fetch_all(executor)
    .await?;

    Ok(rows)
}
