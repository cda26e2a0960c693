//! Workflow executor: runs steps in declared order against one context.
//!
//! # Execution flow
//!
//! 1. Look up the workflow and validate the input against `input_schema`.
//! 2. Run the steps under the workflow timeout (capped by the settings).
//! 3. Each step: evaluate guard -> dispatch operations (sequential, parallel
//!    or conditional) -> store results.
//! 4. Each operation: resolve parameters -> validate -> cache lookup ->
//!    dispatch under timeout -> fallback or error policy on failure.
//! 5. Derive the final status from the recorded errors.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use uuid::Uuid;

use geneflow_types::config::EngineSettings;
use geneflow_types::workflow::{
    ExecutionType, FallbackConfig, OnError, OperationDefinition, OperationType, StepDefinition,
    WorkflowDefinition, WorkflowRunResult, WorkflowRunStatus,
};

use super::cache::{OperationCache, cache_key};
use super::context::WorkflowContext;
use super::{EngineError, builtin};
use crate::condition;
use crate::config::ConfigurationManager;
use crate::template;
use crate::value::validate_against_schema;

/// How one operation ended.
#[derive(Debug)]
enum OperationOutcome {
    Completed(Value),
    /// A fallback produced the value; `warning` explains why.
    Recovered { value: Value, warning: String },
    Failed(EngineError),
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Executes workflows loaded into a [`ConfigurationManager`].
///
/// Cloning is cheap: the manager, settings and cache are shared, so one
/// engine can serve concurrent runs.
#[derive(Clone)]
pub struct WorkflowEngine {
    manager: Arc<ConfigurationManager>,
    cache: OperationCache,
    settings: Arc<EngineSettings>,
}

impl WorkflowEngine {
    pub fn new(manager: Arc<ConfigurationManager>) -> Self {
        Self::with_settings(manager, EngineSettings::default())
    }

    pub fn with_settings(manager: Arc<ConfigurationManager>, settings: EngineSettings) -> Self {
        Self {
            manager,
            cache: OperationCache::new(),
            settings: Arc::new(settings),
        }
    }

    pub fn manager(&self) -> &ConfigurationManager {
        &self.manager
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    // -----------------------------------------------------------------------
    // Cache
    // -----------------------------------------------------------------------

    pub fn set_cache_value(&self, key: impl Into<String>, value: Value) {
        self.cache.set(key, value);
    }

    pub fn get_cache_value(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    pub fn has_cache_value(&self, key: &str) -> bool {
        self.cache.has(key)
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    /// Key for `op` called with fully resolved parameters.
    pub fn generate_cache_key(&self, op: &OperationDefinition, resolved: &Value) -> String {
        cache_key(&op.name, op.target().unwrap_or_default(), resolved)
    }

    pub fn should_use_cache(&self, op: &OperationDefinition) -> bool {
        self.settings.cache_enabled && op.cache_enabled()
    }

    // -----------------------------------------------------------------------
    // Workflow
    // -----------------------------------------------------------------------

    /// Run the named workflow with `input`.
    ///
    /// Operation failures never surface as `Err`; they are recorded in the
    /// returned result and reflected in its status.
    pub async fn execute_workflow(
        &self,
        name: &str,
        input: Value,
    ) -> Result<WorkflowRunResult, EngineError> {
        let workflow = self
            .manager
            .get_workflow(name)
            .ok_or_else(|| EngineError::WorkflowNotFound(name.to_string()))?;

        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let start = Instant::now();
        info!(%run_id, workflow = name, steps = workflow.steps.len(), "workflow run started");

        let mut ctx = WorkflowContext::for_workflow(&workflow, input);
        let mut fatal = false;

        let schema_errors = validate_against_schema(ctx.input(), &workflow.input_schema);
        if schema_errors.is_empty() {
            let secs = workflow
                .global_timeout
                .min(self.settings.max_workflow_timeout_secs);
            let outcome =
                tokio::time::timeout(Duration::from_secs(secs), self.run_steps(&workflow, &mut ctx))
                    .await;
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(%run_id, workflow = name, error = %e, "workflow aborted");
                    fatal = true;
                }
                Err(_) => {
                    let e = EngineError::WorkflowTimeout {
                        workflow: name.to_string(),
                        secs,
                    };
                    warn!(%run_id, workflow = name, secs, "workflow timed out");
                    ctx.add_error(e.to_string());
                    fatal = true;
                }
            }
        } else {
            for e in schema_errors {
                ctx.add_error(format!("input validation failed: {e}"));
            }
            fatal = true;
        }

        let status = if fatal {
            WorkflowRunStatus::Failed
        } else if ctx.has_errors() {
            WorkflowRunStatus::PartiallyFailed
        } else {
            WorkflowRunStatus::Succeeded
        };

        let duration_ms = start.elapsed().as_millis() as u64;
        info!(
            %run_id,
            workflow = name,
            %status,
            errors = ctx.errors().len(),
            warnings = ctx.warnings().len(),
            duration_ms,
            "workflow run finished"
        );

        let (outputs, errors, warnings) = ctx.into_parts();
        Ok(WorkflowRunResult {
            run_id,
            workflow: name.to_string(),
            status,
            outputs,
            errors,
            warnings,
            started_at,
            completed_at: Utc::now(),
            duration_ms,
        })
    }

    async fn run_steps(
        &self,
        workflow: &WorkflowDefinition,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        for step in &workflow.steps {
            self.run_step(step, workflow.error_handling.on_error, ctx)
                .await?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Steps
    // -----------------------------------------------------------------------

    /// Run one step under its own error policy (default: continue).
    ///
    /// Returns `Err` only when a failure is fatal under that policy.
    pub async fn execute_step(
        &self,
        step: &StepDefinition,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        self.run_step(step, OnError::default(), ctx).await
    }

    async fn run_step(
        &self,
        step: &StepDefinition,
        workflow_policy: OnError,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        if let Some(cond) = &step.condition {
            if !guard_passes(cond, &format!("step '{}'", step.name), ctx) {
                debug!(step = %step.name, condition = %cond, "step skipped");
                return Ok(());
            }
        }

        let policy = step
            .error_handling
            .as_ref()
            .map_or(workflow_policy, |e| e.on_error);
        debug!(
            step = %step.name,
            execution_type = %step.execution_type,
            operations = step.operations.len(),
            "running step"
        );

        match step.execution_type {
            ExecutionType::Parallel => self.run_parallel(step, policy, ctx).await,
            ExecutionType::Sequential | ExecutionType::Conditional => {
                let guarded = step.execution_type == ExecutionType::Conditional;
                for op in &step.operations {
                    if guarded {
                        if let Some(cond) = &op.condition {
                            if !guard_passes(cond, &format!("operation '{}'", op.name), ctx) {
                                debug!(operation = %op.name, "operation skipped");
                                continue;
                            }
                        }
                    }
                    let outcome = self.run_operation(op, ctx).await;
                    self.apply_outcome(op, outcome, policy, ctx)?;
                }
                Ok(())
            }
        }
    }

    /// Spawn every operation on a snapshot of the context, wait for all of
    /// them, then apply results in declared order.
    async fn run_parallel(
        &self,
        step: &StepDefinition,
        policy: OnError,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        let snapshot = Arc::new(ctx.clone());
        let semaphore = Arc::new(Semaphore::new(self.settings.max_parallel_operations.max(1)));
        let mut join_set = JoinSet::new();

        for (index, op) in step.operations.iter().enumerate() {
            let engine = self.clone();
            let op = op.clone();
            let snapshot = Arc::clone(&snapshot);
            let semaphore = Arc::clone(&semaphore);
            join_set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                let outcome = engine.run_operation(&op, &snapshot).await;
                (index, outcome)
            });
        }

        let mut outcomes: Vec<Option<OperationOutcome>> =
            step.operations.iter().map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, outcome)) => outcomes[index] = Some(outcome),
                Err(e) => warn!(step = %step.name, error = %e, "operation task failed"),
            }
        }

        let mut first_fatal = None;
        for (op, outcome) in step.operations.iter().zip(outcomes) {
            let outcome = outcome.unwrap_or_else(|| {
                OperationOutcome::Failed(EngineError::InvalidOperation {
                    operation: op.name.clone(),
                    reason: "task did not complete".to_string(),
                })
            });
            if let Err(e) = self.apply_outcome(op, outcome, policy, ctx) {
                first_fatal.get_or_insert(e);
            }
        }
        first_fatal.map_or(Ok(()), Err)
    }

    fn apply_outcome(
        &self,
        op: &OperationDefinition,
        outcome: OperationOutcome,
        policy: OnError,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        match outcome {
            OperationOutcome::Completed(value) => {
                ctx.store_result(op.output_key(), value);
                Ok(())
            }
            OperationOutcome::Recovered { value, warning } => {
                warn!(operation = %op.name, "{warning}");
                ctx.add_warning(warning);
                ctx.store_result(op.output_key(), value);
                Ok(())
            }
            OperationOutcome::Failed(err) => self.handle_operation_error(op, err, policy, ctx),
        }
    }

    /// Record a failed operation. Under [`OnError::Abort`] the error is
    /// returned and stops the run.
    fn handle_operation_error(
        &self,
        op: &OperationDefinition,
        err: EngineError,
        policy: OnError,
        ctx: &mut WorkflowContext,
    ) -> Result<(), EngineError> {
        warn!(operation = %op.name, error = %err, ?policy, "operation failed");
        ctx.add_error(format!("operation '{}' failed: {err}", op.name));
        match policy {
            OnError::Abort => Err(err),
            OnError::Continue => Ok(()),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    async fn run_operation(&self, op: &OperationDefinition, ctx: &WorkflowContext) -> OperationOutcome {
        match self.try_operation(op, ctx).await {
            Ok(value) => OperationOutcome::Completed(value),
            Err(err) => match &op.fallback_config {
                Some(fallback) => self.apply_fallback(op, fallback, ctx, err).await,
                None => OperationOutcome::Failed(err),
            },
        }
    }

    async fn try_operation(
        &self,
        op: &OperationDefinition,
        ctx: &WorkflowContext,
    ) -> Result<Value, EngineError> {
        let params = self.resolve_operation_parameters(op, ctx)?;

        let key = self
            .should_use_cache(op)
            .then(|| self.generate_cache_key(op, &params));
        if let Some(hit) = key.as_deref().and_then(|k| self.cache.get(k)) {
            debug!(operation = %op.name, "cache hit");
            return Ok(hit);
        }

        let secs = self.operation_timeout(op);
        let value = tokio::time::timeout(Duration::from_secs(secs), self.dispatch(op, &params))
            .await
            .map_err(|_| EngineError::OperationTimeout {
                operation: op.name.clone(),
                secs,
            })??;

        if let Some(key) = key {
            self.cache.set(key, value.clone());
        }
        Ok(value)
    }

    fn operation_timeout(&self, op: &OperationDefinition) -> u64 {
        op.timeout_seconds
            .unwrap_or(self.settings.default_operation_timeout_secs)
    }

    /// Resolve placeholders against the context; endpoint calls are then
    /// normalised and validated for their endpoint.
    fn resolve_operation_parameters(
        &self,
        op: &OperationDefinition,
        ctx: &WorkflowContext,
    ) -> Result<Value, EngineError> {
        let resolved = self.resolve_placeholders(&op.parameters, ctx);
        if op.op_type != OperationType::EndpointCall {
            return Ok(resolved);
        }

        let endpoint = op.endpoint_name();
        let supplied = self.manager.alias_parameters(endpoint, &resolved);
        let resolved = self.manager.resolve_parameters(endpoint, &resolved);
        let errors = self.manager.request_errors(endpoint, &supplied, &resolved);
        if !errors.is_empty() {
            return Err(EngineError::Validation {
                endpoint: endpoint.to_string(),
                errors,
            });
        }
        Ok(resolved)
    }

    fn resolve_placeholders(&self, parameters: &Value, ctx: &WorkflowContext) -> Value {
        let raw = if parameters.is_null() {
            Value::Object(Map::new())
        } else {
            parameters.clone()
        };
        let mut entries = self.manager.template_variables();
        entries.extend(ctx.template_entries());
        template::resolve_value(&raw, &entries, &|key: &str| ctx.lookup(key))
    }

    async fn dispatch(&self, op: &OperationDefinition, params: &Value) -> Result<Value, EngineError> {
        match op.op_type {
            OperationType::EndpointCall => {
                let name = op.data_source.as_deref().unwrap_or_default();
                self.call_source(name, op.endpoint_name(), params).await
            }
            OperationType::CustomProcessor => {
                let name = op.processor.as_deref().unwrap_or_default();
                let processor = self
                    .manager
                    .get_processor(name)
                    .ok_or_else(|| EngineError::ProcessorNotFound(name.to_string()))?;
                let input = params.get("input").unwrap_or(params);
                let config = params
                    .get("config")
                    .cloned()
                    .unwrap_or_else(|| Value::Object(Map::new()));
                Ok(processor.process(input, &config)?)
            }
            OperationType::Merge => builtin::merge(&op.name, params),
            OperationType::Filter => builtin::filter(&op.name, params),
            OperationType::Transform => builtin::transform(&op.name, params),
        }
    }

    async fn call_source(
        &self,
        name: &str,
        endpoint: &str,
        params: &Value,
    ) -> Result<Value, EngineError> {
        let source = self
            .manager
            .get_data_source(name)
            .ok_or_else(|| EngineError::DataSourceNotFound(name.to_string()))?;
        Ok(source.execute(endpoint, params).await?)
    }

    /// Try the alternate data source, then the literal value.
    ///
    /// Fallback results are never cached.
    async fn apply_fallback(
        &self,
        op: &OperationDefinition,
        fallback: &FallbackConfig,
        ctx: &WorkflowContext,
        err: EngineError,
    ) -> OperationOutcome {
        let mut reason = err.to_string();

        if let Some(source) = fallback.data_source.as_deref() {
            let endpoint = fallback.endpoint.as_deref().unwrap_or(op.endpoint_name());
            let params = self.manager.resolve_parameters(
                endpoint,
                &self.resolve_placeholders(&op.parameters, ctx),
            );
            let secs = self.operation_timeout(op);
            let attempt =
                tokio::time::timeout(Duration::from_secs(secs), self.call_source(source, endpoint, &params))
                    .await
                    .unwrap_or_else(|_| {
                        Err(EngineError::OperationTimeout {
                            operation: op.name.clone(),
                            secs,
                        })
                    });
            match attempt {
                Ok(value) => {
                    return OperationOutcome::Recovered {
                        value,
                        warning: format!(
                            "operation '{}' used fallback data source '{source}': {reason}",
                            op.name
                        ),
                    };
                }
                Err(e) => {
                    debug!(operation = %op.name, fallback = source, error = %e, "fallback source failed");
                    reason = format!("{reason}; fallback '{source}': {e}");
                }
            }
        }

        match &fallback.value {
            Some(value) => OperationOutcome::Recovered {
                value: value.clone(),
                warning: format!("operation '{}' used fallback value: {reason}", op.name),
            },
            None => OperationOutcome::Failed(EngineError::FallbackExhausted(reason)),
        }
    }
}

/// Evaluate a guard against the context. Evaluation errors are recorded as
/// warnings and count as false.
fn guard_passes(condition: &str, label: &str, ctx: &mut WorkflowContext) -> bool {
    match condition::evaluate(condition, |path: &str| ctx.lookup(path)) {
        Ok(passed) => passed,
        Err(e) => {
            ctx.add_warning(format!("{label} condition '{condition}' not evaluated: {e}"));
            false
        }
    }
}
