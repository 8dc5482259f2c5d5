//! Repository trait definitions (ports).
//!
//! The record store and the vector store are separate traits so the embedding
//! schema can evolve without touching record metadata.

pub mod record;
pub mod vector;
