//! SQLite storage layer.
//!
//! Record and vector repositories backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod embedding;
pub mod pool;
pub mod record;
