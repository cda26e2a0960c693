//! DataSource trait definition.
//!
//! This is the contract every backend (REST API, database, filesystem,
//! cache) implements. Uses RPITIT for the async methods; see
//! [`super::box_source::BoxDataSource`] for dynamic dispatch.

use std::future::Future;

use serde_json::Value;

/// Failures reported by a data source.
#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    /// The backend cannot be reached at all.
    #[error("data source '{source_name}' unavailable: {reason}")]
    Unavailable { source_name: String, reason: String },

    /// The backend was reached but the operation failed.
    #[error("data source '{source_name}' failed to execute '{operation}': {reason}")]
    Execution {
        source_name: String,
        operation: String,
        reason: String,
    },

    #[error("data source '{source_name}' timed out after {secs}s")]
    Timeout { source_name: String, secs: u64 },

    #[error("invalid parameters for '{operation}': {reason}")]
    InvalidParameters { operation: String, reason: String },

    #[error("data source '{source_name}' does not support operation '{operation}'")]
    Unsupported {
        source_name: String,
        operation: String,
    },
}

/// A pluggable backend that executes named operations.
///
/// Instances are shared across concurrent operations, so `execute` takes
/// `&self` and implementations must be `Send + Sync`.
///
/// Implementations live in geneflow-infra (e.g. `RestApiDataSource`).
pub trait DataSource: Send + Sync {
    /// Registered instance name (e.g. "ncbi_api").
    fn name(&self) -> &str;

    /// Backend kind (e.g. "rest_api", "database").
    fn source_type(&self) -> &str;

    /// Run `operation` with `parameters` and return the result.
    fn execute(
        &self,
        operation: &str,
        parameters: &Value,
    ) -> impl Future<Output = Result<Value, DataSourceError>> + Send;

    /// Whether the backend is currently reachable.
    fn is_available(&self) -> impl Future<Output = bool> + Send;

    /// Health probe; defaults to [`DataSource::is_available`].
    fn health_check(&self) -> impl Future<Output = bool> + Send {
        self.is_available()
    }

    /// Non-secret description of the connection, for listings.
    fn connection_info(&self) -> Value;
}
