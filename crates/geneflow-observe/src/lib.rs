//! Observability setup for GeneFlow: structured `tracing` output with an
//! optional OpenTelemetry bridge.

pub mod tracing_setup;

pub use tracing_setup::{init_tracing, init_tracing_with_filter, shutdown_tracing};
