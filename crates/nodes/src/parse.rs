//! Parsing `ir_json` into a [`WorkflowIr`].
//!
//! `ir_json` is treated as an opaque blob everywhere else in the engine — it
//! is never re-serialised before being hashed or stored, since the SDK's
//! `version_hash` is computed over the client's own canonical encoding. This
//! module only ever reads it.

use std::str::FromStr;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::dag::validate_dag;
use crate::error::IrError;
use crate::types::{NodeSpec, NodeType, WorkflowIr};

#[derive(Deserialize)]
struct RawNodeSpec {
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    dependencies: Vec<String>,
    delay_seconds: Option<i64>,
}

#[derive(Deserialize)]
struct RawWorkflowIr {
    nodes: IndexMap<String, RawNodeSpec>,
}

/// Parse and fully validate an `ir_json` document.
///
/// # Errors
/// - [`IrError::InvalidJson`] if the text isn't the expected shape.
/// - [`IrError::UnknownNodeType`] if a node's `type` isn't recognised.
/// - [`IrError::MissingTimerDelay`] if a `TIMER` node lacks a positive
///   `delay_seconds`.
/// - [`IrError::UnknownNodeReference`] / [`IrError::CycleDetected`] from
///   [`validate_dag`].
pub fn parse_ir(ir_json: &str) -> Result<WorkflowIr, IrError> {
    let raw: RawWorkflowIr = serde_json::from_str(ir_json)?;

    let mut nodes = IndexMap::with_capacity(raw.nodes.len());
    for (node_id, raw_node) in raw.nodes {
        let node_type = NodeType::from_str(&raw_node.node_type).map_err(|node_type| {
            IrError::UnknownNodeType {
                node_id: node_id.clone(),
                node_type,
            }
        })?;

        let delay_seconds = match (node_type, raw_node.delay_seconds) {
            (NodeType::Timer, Some(d)) if d > 0 => Some(d as u64),
            (NodeType::Timer, _) => return Err(IrError::MissingTimerDelay(node_id)),
            (_, d) => d.filter(|&d| d > 0).map(|d| d as u64),
        };

        nodes.insert(
            node_id,
            NodeSpec {
                node_type,
                dependencies: raw_node.dependencies,
                delay_seconds,
            },
        );
    }

    let ir = WorkflowIr { nodes };
    validate_dag(&ir)?;
    Ok(ir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_linear_chain() {
        let ir = parse_ir(
            r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#,
        )
        .expect("valid ir");
        assert_eq!(ir.nodes.len(), 2);
        assert_eq!(ir.nodes["b"].dependencies, vec!["a".to_string()]);
    }

    #[test]
    fn rejects_unknown_type() {
        let err = parse_ir(r#"{"nodes": {"a": {"type": "BOGUS", "dependencies": []}}}"#)
            .expect_err("should fail");
        assert!(matches!(err, IrError::UnknownNodeType { .. }));
    }

    #[test]
    fn rejects_timer_without_delay() {
        let err = parse_ir(r#"{"nodes": {"a": {"type": "TIMER", "dependencies": []}}}"#)
            .expect_err("should fail");
        assert!(matches!(err, IrError::MissingTimerDelay(id) if id == "a"));
    }

    #[test]
    fn rejects_zero_delay_timer() {
        let err = parse_ir(
            r#"{"nodes": {"a": {"type": "TIMER", "dependencies": [], "delay_seconds": 0}}}"#,
        )
        .expect_err("should fail");
        assert!(matches!(err, IrError::MissingTimerDelay(_)));
    }

    #[test]
    fn accepts_but_does_not_reject_router_nodes() {
        let ir = parse_ir(
            r#"{"nodes": {"a": {"type": "ROUTER", "dependencies": []}}}"#,
        )
        .expect("router nodes parse fine, they're just not schedulable");
        assert_eq!(ir.nodes["a"].node_type, NodeType::Router);
    }

    #[test]
    fn rejects_cycles() {
        let err = parse_ir(
            r#"{"nodes": {"a": {"type": "COMPUTE", "dependencies": ["b"]}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#,
        )
        .expect_err("should fail");
        assert!(matches!(err, IrError::CycleDetected));
    }
}
