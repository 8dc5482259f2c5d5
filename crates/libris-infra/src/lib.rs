//! Infrastructure layer for libris.
//!
//! Contains implementations of the ports defined in `libris-core`: SQLite
//! record and vector stores, the HTTP catalog client, HTTP embedding
//! providers, and the configuration loader.

pub mod catalog;
pub mod config;
pub mod embedding;
pub mod sqlite;

#[cfg(test)]
pub(crate) mod test_support;
