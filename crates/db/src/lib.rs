//! `db` crate — pure persistence layer.
//!
//! Provides a connection pool, typed row structs, and repository functions
//! for every table in the Nexum schema, plus the content-addressed blob
//! sidecar. No business logic lives here.

pub mod blob;
pub mod error;
pub mod pool;
pub mod repository;
pub mod models;

pub use blob::BlobStore;
pub use pool::DbPool;
pub use error::DbError;
