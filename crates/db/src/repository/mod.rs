//! Repository functions — one function per database operation.
//!
//! Every function takes a `&DbPool` (or an open `Transaction`) and returns a
//! `Result<T, DbError>`. No business logic, no domain types — pure SQL.
//! Operations that must commit atomically across tables take a
//! `&mut Transaction` so the caller (the `engine`/`queue` crates) controls
//! the commit boundary.

pub mod executions;
pub mod task_queue;
pub mod workflow_versions;
