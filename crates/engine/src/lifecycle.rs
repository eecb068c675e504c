//! Execution lifecycle: `RegisterWorkflow`, `StartExecution`, `GetStatus`.
//!
//! Thin orchestration over `db::repository` and `nodes`; the `api` crate's
//! `tonic` handlers call straight into these functions.

use db::models::ExecutionRow;
use db::{repository, DbPool};
use nodes::Compatibility;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::scheduler::Scheduler;
use crate::EngineError;

/// Result of a `RegisterWorkflow` call.
#[derive(Debug, Clone)]
pub struct RegisterOutcome {
    pub compatibility: String,
    pub message: String,
}

/// Parse, validate, and register a workflow IR version.
///
/// Idempotent: registering the same `(workflow_id, version_hash)` twice
/// returns `compatibility = "identical"` without touching storage.
#[instrument(skip(pool, ir_json))]
pub async fn register_workflow(
    pool: &DbPool,
    workflow_id: &str,
    version_hash: &str,
    ir_json: &str,
) -> Result<RegisterOutcome, EngineError> {
    let new_ir = nodes::parse_ir(ir_json)?;

    if let Some(_existing) = repository::workflow_versions::get_version(pool, workflow_id, version_hash).await? {
        return Ok(RegisterOutcome {
            compatibility: "identical".to_string(),
            message: "version already registered".to_string(),
        });
    }

    let compatibility = match repository::workflow_versions::get_latest_version(pool, workflow_id).await? {
        Some(latest) => {
            let existing_ir = nodes::parse_ir(&latest.ir_json)?;
            nodes::classify(&existing_ir, &new_ir)
        }
        None => Compatibility::Compatible,
    };

    repository::workflow_versions::insert_version(pool, workflow_id, version_hash, ir_json).await?;

    info!(workflow_id, version_hash, %compatibility, "workflow version registered");

    Ok(RegisterOutcome {
        compatibility: compatibility.to_string(),
        message: "registered".to_string(),
    })
}

/// Create a new execution and emit its root-ready tasks.
///
/// Duplicate `StartExecution` calls are never errors — a fresh
/// `execution_id` is minted every time; the engine does not deduplicate.
#[instrument(skip(pool, scheduler, input_json))]
pub async fn start_execution(
    pool: &DbPool,
    scheduler: &Scheduler,
    workflow_id: &str,
    version_hash: &str,
    input_json: &str,
) -> Result<Uuid, EngineError> {
    repository::workflow_versions::get_version(pool, workflow_id, version_hash)
        .await?
        .ok_or_else(|| EngineError::UnknownWorkflowVersion {
            workflow_id: workflow_id.to_string(),
            version_hash: version_hash.to_string(),
        })?;

    let execution_id = Uuid::new_v4();
    repository::executions::create_execution(pool, execution_id, workflow_id, version_hash, input_json)
        .await?;

    scheduler.advance(execution_id).await?;

    info!(%execution_id, workflow_id, "execution started");
    Ok(execution_id)
}

/// Fetch an execution's current status and materialised `completed_nodes`.
pub async fn get_status(pool: &DbPool, execution_id: Uuid) -> Result<ExecutionRow, EngineError> {
    repository::executions::get_execution(pool, execution_id)
        .await?
        .ok_or(EngineError::UnknownExecution(execution_id))
}
