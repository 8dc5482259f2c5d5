//! Embedding generation: the provider port, its type-erased wrapper, and the
//! bounded-concurrency batch pipeline that fills the vector store.

pub mod box_provider;
pub mod pipeline;
pub mod provider;
