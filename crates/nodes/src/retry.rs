//! Per-node-type scheduling and retry policy.
//!
//! COMPUTE and TIMER are treated as deterministic: any failure terminates
//! the execution on the first attempt. EFFECT is retriable up to
//! `MAX_ATTEMPTS_EFFECT` times with exponential backoff.

use std::time::Duration;

use crate::types::NodeType;

pub const MAX_ATTEMPTS_EFFECT: u32 = 3;
pub const MAX_ATTEMPTS_COMPUTE: u32 = 1;
pub const MAX_ATTEMPTS_TIMER: u32 = 1;

pub const RETRY_BACKOFF_BASE: Duration = Duration::from_secs(1);
pub const RETRY_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Whether the scheduler ever produces a queue entry for this node type.
///
/// `Router`, `HumanApproval`, `Map`, `Reduce`, and `Subworkflow` are
/// accepted by the IR parser but have no pinned execution semantics yet;
/// an execution that reaches one of them simply never completes.
pub fn is_schedulable(node_type: NodeType) -> bool {
    matches!(node_type, NodeType::Compute | NodeType::Effect | NodeType::Timer)
}

/// Whether a scheduled node needs an external worker to poll for it.
/// `TIMER` is the only schedulable type the engine fires itself.
pub fn requires_worker(node_type: NodeType) -> bool {
    is_schedulable(node_type) && node_type != NodeType::Timer
}

/// Maximum attempts allowed for a node of this type before the execution
/// is marked `FAILED`.
pub fn max_attempts(node_type: NodeType) -> u32 {
    match node_type {
        NodeType::Effect => MAX_ATTEMPTS_EFFECT,
        NodeType::Compute => MAX_ATTEMPTS_COMPUTE,
        NodeType::Timer => MAX_ATTEMPTS_TIMER,
        // Unscheduled types never fail a retry decision.
        _ => 1,
    }
}

/// Exponential backoff delay before attempt number `next_attempt` (1-based)
/// may be claimed, capped at `RETRY_BACKOFF_CAP`.
pub fn backoff(next_attempt: u32) -> Duration {
    let exponent = next_attempt.saturating_sub(1).min(16);
    let scaled = RETRY_BACKOFF_BASE.saturating_mul(1u32 << exponent);
    scaled.min(RETRY_BACKOFF_CAP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_compute_effect_timer_are_schedulable() {
        assert!(is_schedulable(NodeType::Compute));
        assert!(is_schedulable(NodeType::Effect));
        assert!(is_schedulable(NodeType::Timer));
        assert!(!is_schedulable(NodeType::Router));
        assert!(!is_schedulable(NodeType::HumanApproval));
        assert!(!is_schedulable(NodeType::Map));
        assert!(!is_schedulable(NodeType::Reduce));
        assert!(!is_schedulable(NodeType::Subworkflow));
    }

    #[test]
    fn timer_needs_no_worker_but_is_schedulable() {
        assert!(!requires_worker(NodeType::Timer));
        assert!(requires_worker(NodeType::Compute));
        assert!(requires_worker(NodeType::Effect));
    }

    #[test]
    fn backoff_grows_exponentially_and_caps() {
        assert_eq!(backoff(1), Duration::from_secs(1));
        assert_eq!(backoff(2), Duration::from_secs(2));
        assert_eq!(backoff(3), Duration::from_secs(4));
        assert_eq!(backoff(4), Duration::from_secs(8));
        assert_eq!(backoff(10), Duration::from_secs(30));
    }
}
