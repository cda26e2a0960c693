//! Application state shared by the CLI commands and the REST API.
//!
//! AppState owns one [`WorkflowEngine`] built from the configuration file
//! and the engine settings of the data directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use geneflow_core::config::ConfigurationManager;
use geneflow_core::engine::WorkflowEngine;
use geneflow_infra::BuiltinComponentFactory;
use geneflow_infra::config::{default_data_dir, load_configuration, load_engine_settings};
use geneflow_types::config::EngineSettings;

/// File names probed in the data directory when `--config` is not given.
const DEFAULT_CONFIG_FILES: [&str; 4] =
    ["workflows.yaml", "workflows.yml", "workflows.json", "workflows.toml"];

#[derive(Clone)]
pub struct AppState {
    pub engine: WorkflowEngine,
    /// Configuration file the engine was loaded from, if any.
    pub config_path: Option<PathBuf>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load settings from the data directory and the configuration from
    /// `config_path` (or the first `workflows.*` file in the data directory).
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let data_dir = default_data_dir();
        let settings = load_engine_settings(&data_dir).await;
        let factory = BuiltinComponentFactory::new(&settings);

        let config_path = match config_path {
            Some(path) => Some(path.to_path_buf()),
            None => find_default_config(&data_dir).await,
        };

        let manager = match &config_path {
            Some(path) => load_configuration(path, &factory)
                .await
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => {
                tracing::warn!(
                    data_dir = %data_dir.display(),
                    "no configuration file found, starting with an empty configuration"
                );
                ConfigurationManager::new()
            }
        };

        Ok(Self {
            engine: WorkflowEngine::with_settings(Arc::new(manager), settings),
            config_path,
            data_dir,
        })
    }

    /// State around an already loaded configuration.
    pub fn from_manager(manager: ConfigurationManager, settings: EngineSettings) -> Self {
        Self {
            engine: WorkflowEngine::with_settings(Arc::new(manager), settings),
            config_path: None,
            data_dir: default_data_dir(),
        }
    }

    pub fn manager(&self) -> &ConfigurationManager {
        self.engine.manager()
    }
}

async fn find_default_config(data_dir: &Path) -> Option<PathBuf> {
    for name in DEFAULT_CONFIG_FILES {
        let candidate = data_dir.join(name);
        if tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return Some(candidate);
        }
    }
    None
}
