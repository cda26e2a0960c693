//! The component factory that knows every backend shipped in this crate.

use std::collections::HashMap;

use serde::de::DeserializeOwned;

use geneflow_core::config::{ComponentFactory, ConfigError};
use geneflow_core::datasource::BoxDataSource;
use geneflow_core::template;
use geneflow_types::config::EngineSettings;
use geneflow_types::source::ComponentDefinition;

use crate::sources::{
    CacheDataSource, DatabaseDataSource, FileSystemDataSource, RestApiDataSource,
};

/// Builds `rest_api`, `database`, `file_system` and `cache` sources.
/// Processors fall through to the engine's builtin set.
#[derive(Debug, Clone)]
pub struct BuiltinComponentFactory {
    user_agent: String,
}

impl BuiltinComponentFactory {
    pub fn new(settings: &EngineSettings) -> Self {
        Self {
            user_agent: settings.http_user_agent.clone(),
        }
    }
}

impl Default for BuiltinComponentFactory {
    fn default() -> Self {
        Self::new(&EngineSettings::default())
    }
}

/// Deserialize the type-specific config after expanding `${ENV:...}` and
/// other placeholders in its string fields.
fn source_config<T: DeserializeOwned>(
    name: &str,
    definition: &ComponentDefinition,
) -> Result<T, ConfigError> {
    let raw = definition.config_value();
    let resolved = template::resolve_value(&raw, &HashMap::new(), &|_| None);
    serde_json::from_value(resolved).map_err(|e| invalid(name, e))
}

fn invalid(name: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidSource {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

impl ComponentFactory for BuiltinComponentFactory {
    fn create_data_source(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> Result<BoxDataSource, ConfigError> {
        let source = match definition.kind.as_str() {
            "rest_api" => {
                let config = source_config(name, definition)?;
                let source = RestApiDataSource::new(name, config, &self.user_agent)?;
                BoxDataSource::new(source)
            }
            "database" => {
                let config = source_config(name, definition)?;
                let source = DatabaseDataSource::new(name, config).map_err(|e| invalid(name, e))?;
                BoxDataSource::new(source)
            }
            "file_system" => {
                BoxDataSource::new(FileSystemDataSource::new(name, source_config(name, definition)?))
            }
            "cache" => BoxDataSource::new(CacheDataSource::new(name, source_config(name, definition)?)),
            other => {
                return Err(ConfigError::UnknownSourceType {
                    name: name.to_string(),
                    kind: other.to_string(),
                });
            }
        };
        tracing::debug!(source = name, kind = %definition.kind, "data source created");
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geneflow_core::config::ConfigurationManager;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_creates_every_builtin_type() {
        let dir = TempDir::new().unwrap();
        let factory = BuiltinComponentFactory::default();
        let definitions = [
            ("ncbi", json!({"type": "rest_api", "base_url": "https://eutils.ncbi.nlm.nih.gov"})),
            ("genes_db", json!({"type": "database", "connection_string": "sqlite::memory:"})),
            ("files", json!({"type": "file_system", "base_path": dir.path()})),
            ("disk_cache", json!({"type": "cache", "cache_path": dir.path().join("cache")})),
        ];
        for (name, value) in definitions {
            let definition: ComponentDefinition = serde_json::from_value(value).unwrap();
            let source = factory.create_data_source(name, &definition).unwrap();
            assert_eq!(source.name(), name);
            assert_eq!(source.source_type(), definition.kind);
        }
    }

    #[tokio::test]
    async fn test_unknown_type_and_bad_config() {
        let factory = BuiltinComponentFactory::default();

        let ftp = ComponentDefinition::new("ftp", json!({}));
        let err = factory.create_data_source("legacy", &ftp).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSourceType { .. }), "got: {err:?}");

        let rest = ComponentDefinition::new("rest_api", json!({"timeout_seconds": 5}));
        let err = factory.create_data_source("ncbi", &rest).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSource { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_env_placeholders_in_source_config() {
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("GENEFLOW_FACTORY_TEST_URL", "https://example.org") };
        let factory = BuiltinComponentFactory::default();
        let definition = ComponentDefinition::new(
            "rest_api",
            json!({"base_url": "${ENV:GENEFLOW_FACTORY_TEST_URL}"}),
        );
        let source = factory.create_data_source("ncbi", &definition).unwrap();
        assert_eq!(source.connection_info()["base_url"], "https://example.org");
    }

    #[tokio::test]
    async fn test_manager_loads_through_factory() {
        let mut manager = ConfigurationManager::new();
        manager
            .load_configuration_from_value(
                json!({
                    "data_sources": {
                        "genes_db": {"type": "database", "connection_string": "sqlite::memory:"}
                    },
                    "processors": {"qc": {"type": "expression_normalizer"}}
                }),
                &BuiltinComponentFactory::default(),
            )
            .unwrap();
        assert_eq!(manager.available_data_sources(), vec!["genes_db"]);
        assert!(manager.get_processor("qc").is_some());
    }
}
