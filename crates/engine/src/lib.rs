//! `engine` crate — execution lifecycle, scheduling, and the background
//! timer/lease loops.
//!
//! Event-driven over the `task_queue` rather than a single in-process
//! topological walk: `Scheduler::advance` is called after `StartExecution`,
//! after every `CompleteTask`/`FailTask`, and after every timer fire.

pub mod config;
pub mod error;
pub mod lifecycle;
pub mod scheduler;
pub mod sweeper;
pub mod tasks;
pub mod ticker;

pub use config::EngineConfig;
pub use error::EngineError;
pub use lifecycle::{get_status, register_workflow, start_execution, RegisterOutcome};
pub use scheduler::Scheduler;
pub use tasks::{complete_task, fail_task, poll_task};

#[cfg(test)]
mod scenario_tests;
