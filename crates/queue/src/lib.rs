//! `queue` crate — task-queue claim/complete/fail coordination.
//!
//! Wraps `db::repository::task_queue` with the lease semantics and retry
//! policy enforcement the `api` crate's `PollTask`/`CompleteTask`/`FailTask`
//! RPCs need. No HTTP/gRPC, no scheduling decisions — those stay in `engine`.

pub mod error;
pub mod lease;

pub use error::QueueError;
pub use lease::{poll, fail, FailOutcome, DEFAULT_LEASE_TTL_SECS};
