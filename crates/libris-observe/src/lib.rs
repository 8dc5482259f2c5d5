//! Observability setup for libris: tracing subscriber and optional
//! OpenTelemetry export.

pub mod tracing_setup;
