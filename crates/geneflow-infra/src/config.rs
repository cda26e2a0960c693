//! Configuration file loading for GeneFlow.
//!
//! Two kinds of files are read from disk:
//! - workflow configuration documents (`.json`, `.yaml`/`.yml`, `.toml`),
//!   loaded into a [`ConfigurationManager`];
//! - `geneflow.toml` in the data directory (`~/.geneflow/` by default),
//!   deserialized into [`EngineSettings`]. A missing or malformed file falls
//!   back to the defaults.

use std::path::{Path, PathBuf};

use serde_json::Value;

use geneflow_core::config::{ComponentFactory, ConfigError, ConfigurationManager};
use geneflow_types::config::EngineSettings;

/// Environment variable overriding [`default_data_dir`].
pub const DATA_DIR_ENV: &str = "GENEFLOW_DATA_DIR";

const SETTINGS_FILE: &str = "geneflow.toml";

/// `$GENEFLOW_DATA_DIR`, else `~/.geneflow`, else `./.geneflow`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geneflow")
}

/// Parse a configuration document, choosing the format by extension.
/// Unknown extensions are parsed as JSON.
pub fn parse_document(path: &Path, text: &str) -> Result<Value, ConfigError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    let parsed = match extension.as_deref() {
        Some("yaml" | "yml") => serde_yaml_ng::from_str(text).map_err(|e| e.to_string()),
        Some("toml") => toml::from_str(text).map_err(|e| e.to_string()),
        _ => serde_json::from_str(text).map_err(|e| e.to_string()),
    };
    parsed.map_err(|reason| ConfigError::Parse(format!("{}: {reason}", path.display())))
}

/// Read `path` and load it into a fresh [`ConfigurationManager`].
pub async fn load_configuration(
    path: &Path,
    factory: &dyn ComponentFactory,
) -> Result<ConfigurationManager, ConfigError> {
    let text = tokio::fs::read_to_string(path).await?;
    let document = parse_document(path, &text)?;

    let mut manager = ConfigurationManager::new();
    manager.load_configuration_from_value(document, factory)?;
    tracing::info!(
        path = %path.display(),
        workflows = manager.available_workflows().len(),
        "configuration file loaded"
    );
    Ok(manager)
}

/// Load engine settings from `{data_dir}/geneflow.toml`.
///
/// - If the file does not exist, returns [`EngineSettings::default()`].
/// - If the file exists but fails to read or parse, logs a warning and
///   returns the default.
pub async fn load_engine_settings(data_dir: &Path) -> EngineSettings {
    let settings_path = data_dir.join(SETTINGS_FILE);

    let content = match tokio::fs::read_to_string(&settings_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(
                "No {SETTINGS_FILE} found at {}, using defaults",
                settings_path.display()
            );
            return EngineSettings::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", settings_path.display());
            return EngineSettings::default();
        }
    };

    match toml::from_str::<EngineSettings>(&content) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                settings_path.display()
            );
            EngineSettings::default()
        }
    }
}
