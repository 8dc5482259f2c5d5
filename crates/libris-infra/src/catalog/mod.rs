//! Upstream catalog adapters.

pub mod http;
