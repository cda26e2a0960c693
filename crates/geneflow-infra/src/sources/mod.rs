//! Concrete [`DataSource`](geneflow_core::datasource::DataSource) backends.
//!
//! | type          | backend                          |
//! |---------------|----------------------------------|
//! | `rest_api`    | HTTP via `reqwest`               |
//! | `database`    | SQLite via `sqlx`                |
//! | `file_system` | files under a base directory     |
//! | `cache`       | JSON files with TTL and size cap |

pub mod cache;
pub mod database;
pub mod filesystem;
pub mod rest;

pub use cache::{CacheDataSource, CacheSourceConfig};
pub use database::{DatabaseDataSource, DatabaseSourceConfig};
pub use filesystem::{FileSystemDataSource, FileSystemSourceConfig};
pub use rest::{RestApiDataSource, RestApiSourceConfig};

use geneflow_core::datasource::DataSourceError;
use serde_json::Value;

/// Required string parameter.
pub(crate) fn required_str<'a>(
    operation: &str,
    params: &'a Value,
    key: &str,
) -> Result<&'a str, DataSourceError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| DataSourceError::InvalidParameters {
            operation: operation.to_string(),
            reason: format!("missing string parameter '{key}'"),
        })
}
