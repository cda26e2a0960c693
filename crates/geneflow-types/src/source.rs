//! Declarations of data sources and processors inside a configuration
//! document.

use serde::{Deserialize, Serialize};

/// A data source or processor declaration: a `type` tag plus free-form,
/// type-specific configuration fields.
///
/// ```json
/// { "type": "rest_api", "base_url": "https://eutils.ncbi.nlm.nih.gov", "timeout_seconds": 10 }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub config: serde_json::Map<String, serde_json::Value>,
}

impl ComponentDefinition {
    pub fn new(kind: impl Into<String>, config: serde_json::Value) -> Self {
        let config = match config {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };
        Self {
            kind: kind.into(),
            config,
        }
    }

    /// The configuration fields as an object value.
    pub fn config_value(&self) -> serde_json::Value {
        serde_json::Value::Object(self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattened_config() {
        let def: ComponentDefinition = serde_json::from_value(json!({
            "type": "cache",
            "cache_path": "/tmp/cache",
            "ttl_seconds": 60
        }))
        .unwrap();
        assert_eq!(def.kind, "cache");
        assert_eq!(def.config_value()["ttl_seconds"], 60);
        assert!(def.config.get("type").is_none());
    }

    #[test]
    fn test_new_ignores_non_object_config() {
        let def = ComponentDefinition::new("database", json!("oops"));
        assert!(def.config.is_empty());
    }
}
