//! Embedding pipeline, similarity search and port traits for libris.
//!
//! This crate defines the "ports" (repository, provider and catalog traits)
//! that the infrastructure layer implements, plus the logic that runs on top
//! of them. It depends only on `libris-types` -- never on `libris-infra` or
//! any database/HTTP crate.

pub mod catalog;
pub mod embedding;
pub mod repository;
pub mod search;
pub mod service;

#[cfg(test)]
pub(crate) mod test_support;
