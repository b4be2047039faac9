//! SQLite storage layer.
//!
//! Repository and ephemeral store implementations backed by SQLite with WAL
//! mode and split read/write connection pools.

pub mod archive;
pub mod catalog;
pub mod ephemeral;
pub mod pool;
