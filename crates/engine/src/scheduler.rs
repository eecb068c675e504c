//! The scheduler: turns `completed_nodes` + the IR into new `task_queue`
//! entries, and decides when an execution reaches a terminal status.
//!
//! `Scheduler::advance` is the one place that mutates execution/task-queue
//! state together — it is called after `StartExecution`, after every
//! `CompleteTask`, and after every timer fire, always inside a single
//! transaction that locks the execution row for its duration.

use std::str::FromStr;

use chrono::Utc;
use db::models::{ClaimCheck, ExecutionRow, ExecutionStatus};
use db::{repository, BlobStore, DbPool};
use nodes::types::{NodeSpec, NodeType};
use serde_json::{Map, Value};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::EngineError;

/// Computes readiness and emits queue entries. Stateless beyond the pool
/// and blob store it was built with — safe to share across tasks.
#[derive(Clone)]
pub struct Scheduler {
    pool: DbPool,
    blobs: BlobStore,
}

impl Scheduler {
    pub fn new(pool: DbPool, blobs: BlobStore) -> Self {
        Self { pool, blobs }
    }

    /// Re-evaluate one execution: schedule newly-ready nodes, and flip the
    /// execution to `COMPLETED`/`FAILED` if warranted. Idempotent — safe to
    /// call repeatedly or concurrently for the same `execution_id`.
    #[instrument(skip(self), fields(execution_id = %execution_id))]
    pub async fn advance(&self, execution_id: Uuid) -> Result<(), EngineError> {
        let mut tx = self.pool.begin().await.map_err(db::DbError::from)?;

        let execution = repository::executions::get_execution_for_update(&mut *tx, execution_id)
            .await?
            .ok_or(EngineError::UnknownExecution(execution_id))?;

        let status = ExecutionStatus::from_str(&execution.status)
            .expect("executions.status only ever holds a value this engine wrote");

        if status.is_terminal() {
            tx.commit().await.map_err(db::DbError::from)?;
            return Ok(());
        }

        let version = repository::workflow_versions::get_version(
            &self.pool,
            &execution.workflow_id,
            &execution.version_hash,
        )
        .await?
        .ok_or_else(|| EngineError::UnknownWorkflowVersion {
            workflow_id: execution.workflow_id.clone(),
            version_hash: execution.version_hash.clone(),
        })?;

        let ir = nodes::parse_ir(&version.ir_json)?;

        if repository::task_queue::has_failed_terminal(&mut *tx, execution_id).await? {
            repository::executions::set_status(&mut *tx, execution_id, ExecutionStatus::Failed).await?;
            tx.commit().await.map_err(db::DbError::from)?;
            warn!("execution failed: a task exhausted its retry budget");
            return Ok(());
        }

        let completed: Map<String, Value> = serde_json::from_str(&execution.completed_nodes_json)
            .unwrap_or_default();

        if completed.len() >= ir.nodes.len() {
            if status != ExecutionStatus::Completed {
                repository::executions::set_status(&mut *tx, execution_id, ExecutionStatus::Completed)
                    .await?;
                info!("execution completed");
            }
            tx.commit().await.map_err(db::DbError::from)?;
            return Ok(());
        }

        if status == ExecutionStatus::Pending {
            repository::executions::set_status(&mut *tx, execution_id, ExecutionStatus::Running).await?;
        }

        let already_scheduled =
            repository::task_queue::node_ids_with_any_task(&mut *tx, execution_id).await?;

        let exec_input: Value =
            serde_json::from_str(&execution.input_json).unwrap_or(Value::Null);

        for node_id in ir.node_ids_in_declaration_order() {
            if completed.contains_key(node_id) || already_scheduled.contains(node_id) {
                continue;
            }

            let spec = ir.get(node_id).expect("declaration order comes from the same map");

            if !is_ready(spec, &completed) {
                continue;
            }

            if !nodes::retry::is_schedulable(spec.node_type) {
                // Accepted by the parser, never dispatched — see `nodes::retry`.
                continue;
            }

            self.schedule_node(&mut tx, &execution, node_id, spec, &exec_input, &completed)
                .await?;
        }

        tx.commit().await.map_err(db::DbError::from)?;
        Ok(())
    }

    async fn schedule_node(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        execution: &ExecutionRow,
        node_id: &str,
        spec: &NodeSpec,
        exec_input: &Value,
        completed: &Map<String, Value>,
    ) -> Result<(), EngineError> {
        let mut deps = Map::with_capacity(spec.dependencies.len());
        for dep_id in &spec.dependencies {
            let value = self.resolve_dependency_value(completed, dep_id).await?;
            deps.insert(dep_id.clone(), value);
        }

        let payload = serde_json::json!({ "input": exec_input, "deps": deps });
        let input_json = payload.to_string();

        let requires_worker = nodes::retry::requires_worker(spec.node_type);
        let not_before_at = match spec.node_type {
            NodeType::Timer => {
                let delay = spec.delay_seconds.unwrap_or(0);
                Some(Utc::now() + chrono::Duration::seconds(delay as i64))
            }
            _ => None,
        };

        repository::task_queue::insert_ready(
            &mut **tx,
            Uuid::new_v4(),
            execution.execution_id,
            node_id,
            &execution.version_hash,
            1,
            requires_worker,
            not_before_at,
            &input_json,
        )
        .await?;

        info!(node_id, node_type = %spec.node_type, "node scheduled");
        Ok(())
    }

    /// Look up `completed_nodes[dep_id]`, resolving a claim-check pointer to
    /// its inline JSON value by reading the blob sidecar.
    async fn resolve_dependency_value(
        &self,
        completed: &Map<String, Value>,
        dep_id: &str,
    ) -> Result<Value, EngineError> {
        let value = completed.get(dep_id).cloned().unwrap_or(Value::Null);

        match ClaimCheck::from_value(&value) {
            Some(pointer) => {
                let bytes = self.blobs.read(&pointer).await.map_err(db::DbError::from)?;
                Ok(serde_json::from_slice(&bytes).unwrap_or(Value::Null))
            }
            None => Ok(value),
        }
    }
}

fn is_ready(spec: &NodeSpec, completed: &Map<String, Value>) -> bool {
    spec.dependencies.iter().all(|dep| completed.contains_key(dep))
}
