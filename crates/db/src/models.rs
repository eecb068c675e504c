//! Row structs that map 1-to-1 onto database tables.
//!
//! These are *persistence* models — they carry no business logic. Domain
//! types (the parsed IR, node types, retry policy) live in the `nodes`
//! crate; orchestration logic lives in `engine`. Status columns are plain
//! `String`s on these structs (matching what `sqlx::query_as!` returns);
//! the enums below exist for typed matching at call sites, not the column
//! type itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// workflow_versions
// ---------------------------------------------------------------------------

/// A persisted, immutable workflow IR version.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowVersionRow {
    pub workflow_id: String,
    pub version_hash: String,
    /// Canonical `ir_json` exactly as submitted — never re-serialised.
    pub ir_json: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// executions
// ---------------------------------------------------------------------------

/// Lifecycle states of an execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Whether this status is a terminal one — no further `Scheduler::advance`
    /// call ever mutates an execution once it reaches one of these.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        })
    }
}

impl std::str::FromStr for ExecutionStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "RUNNING" => Ok(Self::Running),
            "COMPLETED" => Ok(Self::Completed),
            "FAILED" => Ok(Self::Failed),
            "CANCELLED" => Ok(Self::Cancelled),
            other => Err(format!("unknown execution status: {other}")),
        }
    }
}

/// A persisted execution row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ExecutionRow {
    pub execution_id: Uuid,
    pub workflow_id: String,
    pub version_hash: String,
    pub status: String,
    pub input_json: String,
    /// JSON object: `{node_id: output_value}`. Append-only.
    pub completed_nodes_json: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// task_queue
// ---------------------------------------------------------------------------

/// Lifecycle states of a task-queue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    Ready,
    Leased,
    Done,
    Failed,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Ready => "READY",
            Self::Leased => "LEASED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        })
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "READY" => Ok(Self::Ready),
            "LEASED" => Ok(Self::Leased),
            "DONE" => Ok(Self::Done),
            "FAILED" => Ok(Self::Failed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

/// A persisted task-queue row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct TaskQueueRow {
    pub task_id: Uuid,
    pub execution_id: Uuid,
    pub node_id: String,
    pub version_hash: String,
    pub status: String,
    pub lease_owner: Option<String>,
    pub lease_expires_at: Option<DateTime<Utc>>,
    pub not_before_at: Option<DateTime<Utc>>,
    pub attempt: i32,
    /// Whether a worker must poll for this task (`false` for `TIMER`,
    /// which the engine's own tick loop fires instead).
    pub requires_worker: bool,
    pub input_json: String,
    pub output_json: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Claim-check pointer
// ---------------------------------------------------------------------------

/// Well-known sentinel replacing an output that exceeded the inline-size
/// threshold. Recognised on read by anything resolving dependency inputs,
/// not only when writing outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClaimCheck {
    #[serde(rename = "__nexum_claim_check__")]
    pub marker: bool,
    pub path: String,
    pub sha256: String,
    pub size: u64,
}

impl ClaimCheck {
    pub fn new(path: String, sha256: String, size: u64) -> Self {
        Self {
            marker: true,
            path,
            sha256,
            size,
        }
    }

    /// Returns `Some` if `value` looks like a claim-check pointer object.
    pub fn from_value(value: &serde_json::Value) -> Option<Self> {
        let obj = value.as_object()?;
        if obj.get("__nexum_claim_check__")?.as_bool() != Some(true) {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }
}
