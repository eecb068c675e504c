//! Version-compatibility classification for `RegisterWorkflow`.
//!
//! Only called when a `workflow_id` already has a stored version whose hash
//! differs from the one being registered — the `identical` case is decided
//! by the caller purely from `(workflow_id, version_hash)` key equality and
//! never reaches this module.

use crate::types::WorkflowIr;

/// Result of diffing a newly-registered IR against the latest stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Compatibility {
    /// Every existing node is retained with identical type and dependency
    /// list; only new leaf nodes (no existing node depends on them) may
    /// have been added.
    Compatible,
    /// An existing node's type or dependency list changed, or a node was
    /// removed.
    Breaking,
}

impl std::fmt::Display for Compatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Compatibility::Compatible => write!(f, "compatible"),
            Compatibility::Breaking => write!(f, "breaking"),
        }
    }
}

/// Classify `new` against `existing` (the latest previously-registered IR
/// for the same `workflow_id`).
pub fn classify(existing: &WorkflowIr, new: &WorkflowIr) -> Compatibility {
    for (node_id, old_spec) in &existing.nodes {
        let Some(new_spec) = new.nodes.get(node_id) else {
            return Compatibility::Breaking;
        };
        if new_spec.node_type != old_spec.node_type || new_spec.dependencies != old_spec.dependencies {
            return Compatibility::Breaking;
        }
    }
    Compatibility::Compatible
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::parse_ir;

    #[test]
    fn adding_a_leaf_node_is_compatible() {
        let old = parse_ir(r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}}}"#).unwrap();
        let new = parse_ir(
            r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#,
        )
        .unwrap();
        assert_eq!(classify(&old, &new), Compatibility::Compatible);
    }

    #[test]
    fn changing_a_node_type_is_breaking() {
        let old = parse_ir(r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}}}"#).unwrap();
        let new = parse_ir(r#"{"nodes": {"a": {"type": "COMPUTE", "dependencies": []}}}"#).unwrap();
        assert_eq!(classify(&old, &new), Compatibility::Breaking);
    }

    #[test]
    fn removing_a_node_is_breaking() {
        let old = parse_ir(
            r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#,
        )
        .unwrap();
        let new = parse_ir(r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}}}"#).unwrap();
        assert_eq!(classify(&old, &new), Compatibility::Breaking);
    }

    #[test]
    fn changing_dependencies_is_breaking() {
        let old = parse_ir(
            r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": []}}}"#,
        )
        .unwrap();
        let new = parse_ir(
            r#"{"nodes": {"a": {"type": "EFFECT", "dependencies": []}, "b": {"type": "COMPUTE", "dependencies": ["a"]}}}"#,
        )
        .unwrap();
        assert_eq!(classify(&old, &new), Compatibility::Breaking);
    }
}
