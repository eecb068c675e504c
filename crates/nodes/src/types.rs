//! The node-type vocabulary and the in-memory IR shape.
//!
//! These are the types a parsed `ir_json` document yields. They carry no
//! persistence concerns — the `db` crate stores `ir_json` verbatim and only
//! ever asks this crate to parse it back out.

use indexmap::IndexMap;
use serde::Serialize;

/// A node's behaviour class, as declared in the IR.
///
/// Only `Compute`, `Effect`, and `Timer` are dispatched by the scheduler
/// (see [`crate::retry::is_schedulable`]). The remaining variants are
/// accepted by the parser so that IR produced by a more complete SDK
/// builder surface doesn't fail registration, but no queue entry is ever
/// created for them — an execution containing one stays `RUNNING` forever,
/// per the open question this crate resolves (see `DESIGN.md`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeType {
    /// Deterministic function; any failure is fatal on the first attempt.
    Compute,
    /// Retriable side effect; retried up to `MAX_ATTEMPTS` with backoff.
    Effect,
    /// Wall-clock wait; fired by the engine's own tick loop, not a worker.
    Timer,
    /// Conditional branch. Routing predicates are not pinned — not schedulable.
    Router,
    /// Pause for an external decision. Not schedulable.
    HumanApproval,
    /// Fan-out over a collection. Not schedulable.
    Map,
    /// Fan-in aggregation. Not schedulable.
    Reduce,
    /// Nested workflow invocation. Not schedulable.
    Subworkflow,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Compute => "COMPUTE",
            NodeType::Effect => "EFFECT",
            NodeType::Timer => "TIMER",
            NodeType::Router => "ROUTER",
            NodeType::HumanApproval => "HUMAN_APPROVAL",
            NodeType::Map => "MAP",
            NodeType::Reduce => "REDUCE",
            NodeType::Subworkflow => "SUBWORKFLOW",
        }
    }
}

impl std::str::FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "COMPUTE" => Ok(NodeType::Compute),
            "EFFECT" => Ok(NodeType::Effect),
            "TIMER" => Ok(NodeType::Timer),
            "ROUTER" => Ok(NodeType::Router),
            "HUMAN_APPROVAL" => Ok(NodeType::HumanApproval),
            "MAP" => Ok(NodeType::Map),
            "REDUCE" => Ok(NodeType::Reduce),
            "SUBWORKFLOW" => Ok(NodeType::Subworkflow),
            other => Err(other.to_string()),
        }
    }
}

impl std::fmt::Display for NodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in a parsed workflow IR.
#[derive(Debug, Clone)]
pub struct NodeSpec {
    pub node_type: NodeType,
    /// Ordered list of node IDs this node depends on.
    pub dependencies: Vec<String>,
    /// Only set (and only meaningful) for `NodeType::Timer`.
    pub delay_seconds: Option<u64>,
}

/// A fully parsed workflow DAG.
///
/// `nodes` preserves IR-declaration order (the order the keys appeared in
/// the source `ir_json` object) — the scheduler's tie-break for "multiple
/// nodes become ready in the same step" depends on this order, not on a
/// topological sort.
#[derive(Debug, Clone)]
pub struct WorkflowIr {
    pub nodes: IndexMap<String, NodeSpec>,
}

impl WorkflowIr {
    pub fn get(&self, node_id: &str) -> Option<&NodeSpec> {
        self.nodes.get(node_id)
    }

    pub fn node_ids_in_declaration_order(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(String::as_str)
    }
}
