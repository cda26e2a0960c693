//! Workflow domain types for GeneFlow.
//!
//! A workflow is an ordered list of steps; each step groups operations that
//! share an execution strategy. Definitions are loaded once from a
//! configuration document and are immutable afterwards. This module also
//! contains the run tracking types (`WorkflowRunStatus`, `WorkflowRunResult`).

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A named, declarative workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Workflow name. May be omitted when the workflow is keyed by name in
    /// the `workflows` map of a configuration document.
    #[serde(default)]
    pub name: String,
    /// Optional longer description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Minimal JSON-Schema the run input must satisfy.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub input_schema: serde_json::Value,
    /// Schema describing the declared outputs. When it lists `properties`,
    /// only those keys are exported as outputs.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub output_schema: serde_json::Value,
    /// Ordered steps.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
    /// Whole-run timeout in seconds (default 300).
    #[serde(default = "default_global_timeout")]
    pub global_timeout: u64,
    /// Workflow-level error policy, used when a step has none of its own.
    #[serde(default)]
    pub error_handling: ErrorHandling,
}

fn default_global_timeout() -> u64 {
    300
}

/// Error policy for a workflow or a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorHandling {
    #[serde(default)]
    pub on_error: OnError,
}

/// What happens when an operation fails without a usable fallback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnError {
    /// Record the error and keep going.
    #[default]
    Continue,
    /// Record the error and stop the whole run.
    Abort,
}

// ---------------------------------------------------------------------------
// Step Definition
// ---------------------------------------------------------------------------

/// A group of operations sharing one execution strategy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDefinition {
    pub name: String,
    #[serde(default)]
    pub execution_type: ExecutionType,
    /// Guard evaluated before the step runs. A false guard skips the step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    #[serde(default)]
    pub operations: Vec<OperationDefinition>,
    /// Overrides the workflow-level policy for this step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_handling: Option<ErrorHandling>,
}

/// How the operations of a step are scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionType {
    /// One at a time, in declared order; later operations see earlier outputs.
    #[default]
    Sequential,
    /// Concurrently, against a snapshot of the context taken at step start.
    Parallel,
    /// Sequential, but every operation's own guard is evaluated.
    Conditional,
}

impl fmt::Display for ExecutionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExecutionType::Sequential => "sequential",
            ExecutionType::Parallel => "parallel",
            ExecutionType::Conditional => "conditional",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Operation Definition
// ---------------------------------------------------------------------------

/// The kind of work an operation performs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationType {
    /// Call an endpoint on a registered data source.
    #[default]
    EndpointCall,
    /// Run a registered data processor.
    CustomProcessor,
    /// Merge several values.
    Merge,
    /// Keep the items of an array that match a predicate.
    Filter,
    /// Reshape a value by path mapping.
    Transform,
}

/// The atomic unit of work inside a step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationDefinition {
    pub name: String,
    #[serde(rename = "type", default)]
    pub op_type: OperationType,
    /// Endpoint passed to the data source (defaults to the operation name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processor: Option<String>,
    /// Parameter template; string leaves may contain `${TYPE:KEY}` placeholders.
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub parameters: serde_json::Value,
    /// Context key the result is stored under (defaults to the operation name).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_config: Option<CacheConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_config: Option<FallbackConfig>,
    /// Per-operation guard, honoured by `conditional` steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Per-operation timeout; the engine default applies when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl OperationDefinition {
    /// Key the operation's result is stored under.
    pub fn output_key(&self) -> &str {
        self.output_key.as_deref().unwrap_or(&self.name)
    }

    /// Endpoint name sent to the data source.
    pub fn endpoint_name(&self) -> &str {
        self.endpoint.as_deref().unwrap_or(&self.name)
    }

    /// Name of the data source or processor this operation targets, if any.
    pub fn target(&self) -> Option<&str> {
        match self.op_type {
            OperationType::EndpointCall => self.data_source.as_deref(),
            OperationType::CustomProcessor => self.processor.as_deref(),
            OperationType::Merge | OperationType::Filter | OperationType::Transform => None,
        }
    }

    /// Whether results of this operation go through the engine cache.
    pub fn cache_enabled(&self) -> bool {
        self.cache_config.as_ref().is_some_and(|c| c.enabled)
    }
}

/// Per-operation caching switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// What to do when an operation fails.
///
/// An alternate data source is tried first; if it is absent or also fails,
/// the literal `value` is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FallbackConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,
    /// Endpoint to call on the alternate source (defaults to the operation's).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Workflow Run
// ---------------------------------------------------------------------------

/// Lifecycle status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowRunStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    PartiallyFailed,
}

impl WorkflowRunStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowRunStatus::Succeeded
                | WorkflowRunStatus::Failed
                | WorkflowRunStatus::PartiallyFailed
        )
    }
}

impl fmt::Display for WorkflowRunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            WorkflowRunStatus::Pending => "pending",
            WorkflowRunStatus::Running => "running",
            WorkflowRunStatus::Succeeded => "succeeded",
            WorkflowRunStatus::Failed => "failed",
            WorkflowRunStatus::PartiallyFailed => "partially_failed",
        };
        f.write_str(s)
    }
}

/// Final report of a single workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowRunResult {
    /// UUIDv7 run ID.
    pub run_id: Uuid,
    pub workflow: String,
    pub status: WorkflowRunStatus,
    /// Declared outputs, keyed by output key.
    pub outputs: BTreeMap<String, serde_json::Value>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl WorkflowRunResult {
    /// The `{status, outputs, errors, warnings}` value returned to callers.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "status": self.status,
            "outputs": self.outputs,
            "errors": self.errors,
            "warnings": self.warnings,
        })
    }
}
