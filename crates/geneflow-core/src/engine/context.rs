//! Per-run state: input, variables, declared outputs, errors and warnings.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use geneflow_types::workflow::WorkflowDefinition;

use crate::value::{lookup_path, value_to_string};

/// Mutable state that flows through one workflow run.
///
/// Every operation result lands in `variables`; `outputs` holds the subset
/// the workflow declares as its output. Parallel steps work on clones and
/// the engine merges results back in declared order.
#[derive(Debug, Clone, Default)]
pub struct WorkflowContext {
    input: Value,
    variables: BTreeMap<String, Value>,
    outputs: BTreeMap<String, Value>,
    errors: Vec<String>,
    warnings: Vec<String>,
    /// Keys allowed into `outputs`. `None` admits every key.
    output_filter: Option<BTreeSet<String>>,
}

impl WorkflowContext {
    pub fn new(input: Value) -> Self {
        Self {
            input,
            ..Self::default()
        }
    }

    /// Context for a run of `workflow`. When the output schema lists
    /// `properties`, only those keys are exposed as outputs.
    pub fn for_workflow(workflow: &WorkflowDefinition, input: Value) -> Self {
        let output_filter = workflow
            .output_schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|props| props.keys().cloned().collect());
        Self {
            input,
            output_filter,
            ..Self::default()
        }
    }

    pub fn input(&self) -> &Value {
        &self.input
    }

    pub fn set_variable(&mut self, key: impl Into<String>, value: Value) {
        self.variables.insert(key.into(), value);
    }

    pub fn get_variable(&self, key: &str) -> Option<&Value> {
        self.variables.get(key)
    }

    pub fn set_output(&mut self, key: impl Into<String>, value: Value) {
        self.outputs.insert(key.into(), value);
    }

    pub fn get_output(&self, key: &str) -> Option<&Value> {
        self.outputs.get(key)
    }

    pub fn all_outputs(&self) -> &BTreeMap<String, Value> {
        &self.outputs
    }

    /// Record an operation result under `key`.
    pub fn store_result(&mut self, key: &str, value: Value) {
        let exposed = self
            .output_filter
            .as_ref()
            .is_none_or(|allowed| allowed.contains(key));
        if exposed {
            self.outputs.insert(key.to_string(), value.clone());
        }
        self.variables.insert(key.to_string(), value);
    }

    pub fn add_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Split into `(outputs, errors, warnings)`.
    pub fn into_parts(self) -> (BTreeMap<String, Value>, Vec<String>, Vec<String>) {
        (self.outputs, self.errors, self.warnings)
    }

    /// Resolve a dotted path: variables first, then outputs, then the
    /// input (`input.x` explicitly, or a bare input field). A trailing
    /// `length` on an array or string yields its length.
    pub fn lookup(&self, path: &str) -> Option<Value> {
        if let Some(found) = self.lookup_exact(path) {
            return Some(found.clone());
        }
        let base = path.strip_suffix(".length")?;
        match self.lookup_exact(base)? {
            Value::Array(items) => Some(Value::from(items.len())),
            Value::String(s) => Some(Value::from(s.chars().count())),
            _ => None,
        }
    }

    fn lookup_exact(&self, path: &str) -> Option<&Value> {
        let (head, rest) = split_head(path);
        if let Some(root) = self.variables.get(head).or_else(|| self.outputs.get(head)) {
            return lookup_path(root, rest);
        }
        if head == "input" {
            return lookup_path(&self.input, rest);
        }
        lookup_path(&self.input, path)
    }

    /// Flat string map for placeholder resolution: input scalars and every
    /// variable, rendered as text.
    pub fn template_entries(&self) -> HashMap<String, String> {
        let mut entries = HashMap::new();
        if let Value::Object(map) = &self.input {
            for (k, v) in map {
                entries.insert(k.clone(), value_to_string(v));
            }
        }
        for (k, v) in &self.variables {
            entries.insert(k.clone(), value_to_string(v));
        }
        entries
    }
}

fn split_head(path: &str) -> (&str, &str) {
    let end = path.find(['.', '[']).unwrap_or(path.len());
    let (head, rest) = path.split_at(end);
    (head, rest.strip_prefix('.').unwrap_or(rest))
}
