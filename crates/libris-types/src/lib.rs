//! Shared domain types for libris.
//!
//! This crate contains the domain types used across the workspace:
//! bibliographic records, stored embeddings, search results, batch and sync
//! reports, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod batch;
pub mod config;
pub mod embedding;
pub mod error;
pub mod record;
pub mod sync;
