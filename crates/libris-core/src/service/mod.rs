//! Services composed from the ports: catalog ingestion and free-text query.

pub mod query;
pub mod sync;
