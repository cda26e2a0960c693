//! Configuration manager: registries, parameter resolution and validation.

pub mod factory;
pub mod manager;
pub mod validation;

pub use factory::ComponentFactory;
pub use manager::ConfigurationManager;

/// Errors raised while loading configuration. A failed load leaves the
/// manager in its previous state.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("data source '{name}' has unknown type '{kind}'")]
    UnknownSourceType { name: String, kind: String },

    #[error("processor '{name}' has unknown type '{kind}'")]
    UnknownProcessorType { name: String, kind: String },

    #[error("invalid configuration for '{name}': {reason}")]
    InvalidSource { name: String, reason: String },

    #[error("invalid pattern '{pattern}' for {endpoint}.{field}: {reason}")]
    InvalidPattern {
        endpoint: String,
        field: String,
        pattern: String,
        reason: String,
    },

    #[error("invalid workflow '{name}': {}", errors.join("; "))]
    InvalidWorkflow { name: String, errors: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
