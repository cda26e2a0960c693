//! Construction of data sources and processors from their declarations.

use geneflow_types::source::ComponentDefinition;

use super::ConfigError;
use crate::datasource::BoxDataSource;
use crate::processor::{BoxDataProcessor, builtin_processor};

/// Builds components from `{type, ...}` declarations.
///
/// The concrete backends live in geneflow-infra, so the manager asks a
/// factory instead of naming them. Unknown types must be reported as
/// [`ConfigError::UnknownSourceType`] / [`ConfigError::UnknownProcessorType`].
pub trait ComponentFactory: Send + Sync {
    fn create_data_source(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> Result<BoxDataSource, ConfigError>;

    /// Defaults to the processors shipped with the engine.
    fn create_processor(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> Result<BoxDataProcessor, ConfigError> {
        builtin_processor(&definition.kind).ok_or_else(|| ConfigError::UnknownProcessorType {
            name: name.to_string(),
            kind: definition.kind.clone(),
        })
    }
}
