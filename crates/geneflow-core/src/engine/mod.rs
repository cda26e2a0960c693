//! Workflow engine: runs declarative workflows against the registered data
//! sources and processors.

pub mod builtin;
pub mod cache;
pub mod context;
pub mod executor;

pub use cache::OperationCache;
pub use context::WorkflowContext;
pub use executor::WorkflowEngine;

use crate::datasource::DataSourceError;
use crate::processor::ProcessorError;
use crate::value::ValueError;

/// Errors raised while running a workflow.
///
/// Only [`EngineError::WorkflowNotFound`] escapes `execute_workflow`; the
/// rest are recorded in the run result.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),

    #[error("data source not found: {0}")]
    DataSourceNotFound(String),

    #[error("processor not found: {0}")]
    ProcessorNotFound(String),

    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    #[error(transparent)]
    Processor(#[from] ProcessorError),

    #[error("validation failed for '{endpoint}': {}", errors.join("; "))]
    Validation {
        endpoint: String,
        errors: Vec<String>,
    },

    #[error("operation '{operation}' timed out after {secs}s")]
    OperationTimeout { operation: String, secs: u64 },

    #[error("workflow '{workflow}' timed out after {secs}s")]
    WorkflowTimeout { workflow: String, secs: u64 },

    #[error("invalid operation '{operation}': {reason}")]
    InvalidOperation { operation: String, reason: String },

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("all fallbacks failed: {0}")]
    FallbackExhausted(String),
}
