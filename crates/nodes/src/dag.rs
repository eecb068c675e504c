//! DAG validation — run on every `RegisterWorkflow`.
//!
//! Rules enforced:
//! 1. Every dependency id must reference a node declared in the same IR.
//! 2. The dependency graph must be acyclic (topological sort must succeed).
//!
//! Returns a topologically-sorted list of node IDs on success. This order
//! is used for validation and CLI reporting only — the scheduler's
//! ready-node tie-break uses IR-declaration order instead (see
//! [`crate::types::WorkflowIr::node_ids_in_declaration_order`]).

use std::collections::{HashMap, HashSet, VecDeque};

use crate::{error::IrError, types::WorkflowIr};

pub fn validate_dag(ir: &WorkflowIr) -> Result<Vec<String>, IrError> {
    let node_ids: HashSet<&str> = ir.nodes.keys().map(String::as_str).collect();

    // Every dependency must reference a known node.
    for (node_id, spec) in &ir.nodes {
        for dep in &spec.dependencies {
            if !node_ids.contains(dep.as_str()) {
                return Err(IrError::UnknownNodeReference {
                    node_id: node_id.clone(),
                    dependency_id: dep.clone(),
                });
            }
        }
    }

    // Kahn's algorithm: adjacency is dep -> dependents, in-degree counts
    // how many unresolved dependencies a node has.
    let mut adjacency: HashMap<&str, Vec<&str>> = HashMap::new();
    let mut in_degree: HashMap<&str, usize> = HashMap::new();

    for node_id in ir.nodes.keys() {
        adjacency.entry(node_id.as_str()).or_default();
        in_degree.entry(node_id.as_str()).or_insert(0);
    }

    for (node_id, spec) in &ir.nodes {
        for dep in &spec.dependencies {
            adjacency
                .entry(dep.as_str())
                .or_default()
                .push(node_id.as_str());
            *in_degree.entry(node_id.as_str()).or_insert(0) += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &d)| d == 0)
        .map(|(&id, _)| id)
        .collect();
    // Deterministic iteration order: favour IR-declaration order among
    // initially-ready nodes rather than whatever the HashMap happens to give.
    let declared: Vec<&str> = ir.node_ids_in_declaration_order().collect();
    queue.make_contiguous().sort_by_key(|id| {
        declared
            .iter()
            .position(|d| d == id)
            .unwrap_or(usize::MAX)
    });

    let mut sorted: Vec<String> = Vec::with_capacity(ir.nodes.len());

    while let Some(node_id) = queue.pop_front() {
        sorted.push(node_id.to_owned());

        if let Some(neighbours) = adjacency.get(node_id) {
            for &neighbour in neighbours {
                let deg = in_degree.entry(neighbour).or_insert(0);
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(neighbour);
                }
            }
        }
    }

    if sorted.len() != ir.nodes.len() {
        return Err(IrError::CycleDetected);
    }

    Ok(sorted)
}
