//! Configuration types for GeneFlow.
//!
//! `EngineSettings` is the process-level `geneflow.toml` that tunes the
//! engine. `ConfigDocument` is the declarative document describing data
//! sources, processors, workflows, parameter templates and validation rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::source::ComponentDefinition;
use crate::validation::{ParameterTemplate, ValidationRule};
use crate::workflow::WorkflowDefinition;

/// Endpoints that must never run without at least one meaningful search
/// parameter.
pub const DEFAULT_BROAD_SEARCH_ENDPOINTS: [&str; 3] = [
    "getResearchAssociations",
    "getDrugGeneInteractions",
    "getPolygeneticRiskScores",
];

// ---------------------------------------------------------------------------
// Engine settings
// ---------------------------------------------------------------------------

/// Engine tuning loaded from `geneflow.toml`. All fields have defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Timeout for operations that do not set `timeout_seconds`.
    #[serde(default = "default_operation_timeout_secs")]
    pub default_operation_timeout_secs: u64,

    /// Upper bound applied to every workflow's `global_timeout`.
    #[serde(default = "default_max_workflow_timeout_secs")]
    pub max_workflow_timeout_secs: u64,

    /// Global switch for the engine-level operation cache.
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,

    /// Maximum number of operations of one parallel step running at once.
    #[serde(default = "default_max_parallel_operations")]
    pub max_parallel_operations: usize,

    /// User agent sent by REST data sources.
    #[serde(default = "default_http_user_agent")]
    pub http_user_agent: String,
}

fn default_operation_timeout_secs() -> u64 {
    30
}

fn default_max_workflow_timeout_secs() -> u64 {
    3600
}

fn default_cache_enabled() -> bool {
    true
}

fn default_max_parallel_operations() -> usize {
    8
}

fn default_http_user_agent() -> String {
    "GeneFlow/0.1".to_string()
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_operation_timeout_secs: default_operation_timeout_secs(),
            max_workflow_timeout_secs: default_max_workflow_timeout_secs(),
            cache_enabled: default_cache_enabled(),
            max_parallel_operations: default_max_parallel_operations(),
            http_user_agent: default_http_user_agent(),
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration document
// ---------------------------------------------------------------------------

/// Workflows may be written as a name-keyed map or as a list.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkflowSet {
    Map(BTreeMap<String, WorkflowDefinition>),
    List(Vec<WorkflowDefinition>),
}

impl Default for WorkflowSet {
    fn default() -> Self {
        WorkflowSet::List(Vec::new())
    }
}

impl WorkflowSet {
    /// Flatten into definitions, filling empty names from map keys.
    pub fn into_definitions(self) -> Vec<WorkflowDefinition> {
        match self {
            WorkflowSet::Map(map) => map
                .into_iter()
                .map(|(key, mut wf)| {
                    if wf.name.is_empty() {
                        wf.name = key;
                    }
                    wf
                })
                .collect(),
            WorkflowSet::List(list) => list,
        }
    }
}

/// The full declarative configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigDocument {
    #[serde(default)]
    pub data_sources: BTreeMap<String, ComponentDefinition>,

    #[serde(default)]
    pub processors: BTreeMap<String, ComponentDefinition>,

    #[serde(default)]
    pub workflows: WorkflowSet,

    /// Per-endpoint parameter templates (defaults and aliases).
    #[serde(default)]
    pub parameter_templates: BTreeMap<String, ParameterTemplate>,

    /// Per-endpoint, per-field validation rules.
    #[serde(default)]
    pub validation_rules: BTreeMap<String, BTreeMap<String, ValidationRule>>,

    /// Values visible to `${CONFIG:NAME}` placeholders.
    #[serde(default)]
    pub variables: BTreeMap<String, serde_json::Value>,

    #[serde(default = "default_broad_search_endpoints")]
    pub broad_search_endpoints: Vec<String>,
}

fn default_broad_search_endpoints() -> Vec<String> {
    DEFAULT_BROAD_SEARCH_ENDPOINTS
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for ConfigDocument {
    fn default() -> Self {
        Self {
            data_sources: BTreeMap::new(),
            processors: BTreeMap::new(),
            workflows: WorkflowSet::default(),
            parameter_templates: BTreeMap::new(),
            validation_rules: BTreeMap::new(),
            variables: BTreeMap::new(),
            broad_search_endpoints: default_broad_search_endpoints(),
        }
    }
}
