//! `executions` repository.
//!
//! Every function is generic over `sqlx::PgExecutor` so callers can pass
//! either a bare `&PgPool` for a single-statement call, or `&mut *tx` to
//! fold the call into a larger atomic transaction — the scheduler commits
//! execution-status and task-queue changes together.

use chrono::Utc;
use sqlx::PgExecutor;
use uuid::Uuid;

use crate::{models::ExecutionRow, models::ExecutionStatus, DbError};

/// Create a new execution row in `PENDING` status with empty
/// `completed_nodes_json`.
pub async fn create_execution<'e, E>(
    executor: E,
    execution_id: Uuid,
    workflow_id: &str,
    version_hash: &str,
    input_json: &str,
) -> Result<ExecutionRow, DbError>
where
    E: PgExecutor<'e>,
{
    let now = Utc::now();

    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        INSERT INTO executions
            (execution_id, workflow_id, version_hash, status, input_json, completed_nodes_json, created_at, updated_at)
        VALUES ($1, $2, $3, 'PENDING', $4, '{}', $5, $5)
        RETURNING execution_id, workflow_id, version_hash, status, input_json, completed_nodes_json, created_at, updated_at
        "#,
        execution_id,
        workflow_id,
        version_hash,
        input_json,
        now,
    )
    .fetch_one(executor)
    .await?;

    Ok(row)
}

/// Fetch an execution row, locking it (`FOR UPDATE`) — callers that mutate
/// `completed_nodes_json`/`status` should always read through this inside
/// an open `Transaction`.
pub async fn get_execution_for_update<'e, E>(
    executor: E,
    execution_id: Uuid,
) -> Result<Option<ExecutionRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        SELECT execution_id, workflow_id, version_hash, status, input_json, completed_nodes_json, created_at, updated_at
        FROM executions
        WHERE execution_id = $1
        FOR UPDATE
        "#,
        execution_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Plain, non-locking read — used by `GetStatus`.
pub async fn get_execution<'e, E>(
    executor: E,
    execution_id: Uuid,
) -> Result<Option<ExecutionRow>, DbError>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as!(
        ExecutionRow,
        r#"
        SELECT execution_id, workflow_id, version_hash, status, input_json, completed_nodes_json, created_at, updated_at
        FROM executions
        WHERE execution_id = $1
        "#,
        execution_id,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row)
}

/// Transition `status`. Legal targets (`RUNNING`, `COMPLETED`, `FAILED`,
/// `CANCELLED`) are enforced by the `engine` state machine, not here.
pub async fn set_status<'e, E>(
    executor: E,
    execution_id: Uuid,
    status: ExecutionStatus,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    sqlx::query!(
        r#"UPDATE executions SET status = $1, updated_at = $2 WHERE execution_id = $3"#,
        status.to_string(),
        Utc::now(),
        execution_id,
    )
    .execute(executor)
    .await?;

    Ok(())
}

/// Merge `node_id -> output_value` into `completed_nodes_json`. Callers
/// must never call this twice for the same `node_id` on the same
/// execution — the `task_queue` `DONE` transition guards this by design
/// (at most one row reaches `DONE` per `(execution_id, node_id)`).
pub async fn set_completed_node<'e, E>(
    executor: E,
    execution_id: Uuid,
    node_id: &str,
    output_json: &str,
) -> Result<(), DbError>
where
    E: PgExecutor<'e>,
{
    let output_value: serde_json::Value = serde_json::from_str(output_json)
        .unwrap_or_else(|_| serde_json::Value::String(output_json.to_string()));

    sqlx::query!(
        r#"
        UPDATE executions
        SET completed_nodes_json = jsonb_set(completed_nodes_json::jsonb, ARRAY[$1], $2::jsonb, true)::text,
            updated_at = $3
        WHERE execution_id = $4
        "#,
        node_id,
        output_value,
        Utc::now(),
        execution_id,
    )
    .execute(executor)
    .await?;

    Ok(())
}
