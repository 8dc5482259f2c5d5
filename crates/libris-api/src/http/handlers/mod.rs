//! HTTP request handlers for the query API.

pub mod record;
pub mod search;
pub mod stats;
