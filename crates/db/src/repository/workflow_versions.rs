//! `workflow_versions` repository — append-only.

use chrono::Utc;
use sqlx::PgPool;

use crate::{models::WorkflowVersionRow, DbError};

/// Fetch a single `(workflow_id, version_hash)` version, if it exists.
pub async fn get_version(
    pool: &PgPool,
    workflow_id: &str,
    version_hash: &str,
) -> Result<Option<WorkflowVersionRow>, DbError> {
    let row = sqlx::query_as!(
        WorkflowVersionRow,
        r#"
        SELECT workflow_id, version_hash, ir_json, created_at
        FROM workflow_versions
        WHERE workflow_id = $1 AND version_hash = $2
        "#,
        workflow_id,
        version_hash,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Fetch the most recently registered version for `workflow_id`.
pub async fn get_latest_version(
    pool: &PgPool,
    workflow_id: &str,
) -> Result<Option<WorkflowVersionRow>, DbError> {
    let row = sqlx::query_as!(
        WorkflowVersionRow,
        r#"
        SELECT workflow_id, version_hash, ir_json, created_at
        FROM workflow_versions
        WHERE workflow_id = $1
        ORDER BY created_at DESC
        LIMIT 1
        "#,
        workflow_id,
    )
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

/// Insert a new, immutable version row. The caller must already have
/// confirmed `(workflow_id, version_hash)` doesn't exist — registration is
/// idempotent at the `engine` layer, not here.
pub async fn insert_version(
    pool: &PgPool,
    workflow_id: &str,
    version_hash: &str,
    ir_json: &str,
) -> Result<WorkflowVersionRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as!(
        WorkflowVersionRow,
        r#"
        INSERT INTO workflow_versions (workflow_id, version_hash, ir_json, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (workflow_id, version_hash) DO NOTHING
        RETURNING workflow_id, version_hash, ir_json, created_at
        "#,
        workflow_id,
        version_hash,
        ir_json,
        now,
    )
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => Ok(row),
        None => get_version(pool, workflow_id, version_hash)
            .await?
            .ok_or(DbError::NotFound),
    }
}
