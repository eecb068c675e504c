//! `nodes` — the IR vocabulary: node types, DAG validation, version
//! compatibility, and the per-node-type retry policy.
//!
//! Nothing in this crate executes a node — Nexum nodes run on external
//! workers reached through the gRPC poll/complete/fail protocol (see the
//! `api` and `queue` crates). This crate only describes what a node *is*.

pub mod compat;
pub mod dag;
pub mod error;
pub mod parse;
pub mod retry;
pub mod types;

pub use compat::{classify, Compatibility};
pub use dag::validate_dag;
pub use error::IrError;
pub use parse::parse_ir;
pub use types::{NodeSpec, NodeType, WorkflowIr};
