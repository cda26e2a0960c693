//! ConfigurationManager -- owns the registries, workflow definitions,
//! parameter templates and validation rules of one configuration.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info};

use geneflow_types::config::{ConfigDocument, DEFAULT_BROAD_SEARCH_ENDPOINTS};
use geneflow_types::validation::{ParameterTemplate, ValidationRule};
use geneflow_types::workflow::{OperationDefinition, OperationType, WorkflowDefinition};

use super::validation::{broad_search_error, validate_field};
use super::{ComponentFactory, ConfigError};
use crate::condition;
use crate::datasource::{BoxDataSource, DataSourceRegistry};
use crate::processor::{
    BUILTIN_PROCESSOR_TYPES, BoxDataProcessor, DataProcessor, ProcessorRegistry, builtin_processor,
};
use crate::template::{self, is_template_string};
use crate::value::value_to_string;

/// Explicit, instance-owned configuration state.
///
/// Several managers can coexist (e.g. one per test). Loading builds a
/// staged copy and only swaps it in when everything validated, so a failed
/// load leaves the previous state untouched.
#[derive(Clone)]
pub struct ConfigurationManager {
    data_sources: DataSourceRegistry,
    processors: ProcessorRegistry,
    workflows: BTreeMap<String, Arc<WorkflowDefinition>>,
    parameter_templates: BTreeMap<String, ParameterTemplate>,
    validation_rules: BTreeMap<String, BTreeMap<String, ValidationRule>>,
    patterns: HashMap<String, Regex>,
    variables: BTreeMap<String, Value>,
    broad_search_endpoints: BTreeSet<String>,
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigurationManager {
    /// Empty configuration with the builtin processors registered under
    /// their type names.
    pub fn new() -> Self {
        let mut processors = ProcessorRegistry::new();
        for kind in BUILTIN_PROCESSOR_TYPES {
            if let Some(p) = builtin_processor(kind) {
                processors.register(kind, p);
            }
        }
        Self {
            data_sources: DataSourceRegistry::new(),
            processors,
            workflows: BTreeMap::new(),
            parameter_templates: BTreeMap::new(),
            validation_rules: BTreeMap::new(),
            patterns: HashMap::new(),
            variables: BTreeMap::new(),
            broad_search_endpoints: DEFAULT_BROAD_SEARCH_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }

    // -----------------------------------------------------------------------
    // Loading
    // -----------------------------------------------------------------------

    pub fn load_configuration_from_json(
        &mut self,
        text: &str,
        factory: &dyn ComponentFactory,
    ) -> Result<(), ConfigError> {
        let doc: Value =
            serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        self.load_configuration_from_value(doc, factory)
    }

    pub fn load_configuration_from_value(
        &mut self,
        doc: Value,
        factory: &dyn ComponentFactory,
    ) -> Result<(), ConfigError> {
        let doc: ConfigDocument =
            serde_json::from_value(doc).map_err(|e| ConfigError::Parse(e.to_string()))?;
        self.apply_document(doc, factory)
    }

    /// Populate registries and definitions from a parsed document.
    pub fn apply_document(
        &mut self,
        doc: ConfigDocument,
        factory: &dyn ComponentFactory,
    ) -> Result<(), ConfigError> {
        let mut next = self.clone();

        for (name, definition) in &doc.data_sources {
            let source = factory.create_data_source(name, definition)?;
            next.register_data_source(name.clone(), source);
        }
        for (name, definition) in &doc.processors {
            let processor = factory.create_processor(name, definition)?;
            next.register_processor(name.clone(), processor);
        }
        for (endpoint, rules) in doc.validation_rules {
            next.set_validation_rules(&endpoint, rules)?;
        }
        next.parameter_templates.extend(doc.parameter_templates);
        next.variables.extend(doc.variables);
        next.broad_search_endpoints = doc.broad_search_endpoints.into_iter().collect();

        for workflow in doc.workflows.into_definitions() {
            next.load_workflow(workflow)?;
        }

        info!(
            data_sources = next.data_sources.len(),
            workflows = next.workflows.len(),
            "configuration loaded"
        );
        *self = next;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Registries
    // -----------------------------------------------------------------------

    /// Register a data source. Re-registering a name replaces the previous
    /// entry; returns `true` in that case.
    pub fn register_data_source(&mut self, name: impl Into<String>, source: BoxDataSource) -> bool {
        let name = name.into();
        let replaced = self.data_sources.register(name.clone(), source);
        debug!(source = %name, replaced, "registered data source");
        replaced
    }

    /// Register a processor. Last registration wins.
    pub fn register_processor(
        &mut self,
        name: impl Into<String>,
        processor: BoxDataProcessor,
    ) -> bool {
        self.processors.register(name, processor)
    }

    pub fn get_data_source(&self, name: &str) -> Option<Arc<BoxDataSource>> {
        self.data_sources.get(name)
    }

    pub fn get_processor(&self, name: &str) -> Option<Arc<dyn DataProcessor>> {
        self.processors.get(name)
    }

    pub fn data_sources(&self) -> &DataSourceRegistry {
        &self.data_sources
    }

    /// Names of registered data sources, sorted.
    pub fn available_data_sources(&self) -> Vec<String> {
        self.data_sources.list_names()
    }

    pub fn available_processors(&self) -> Vec<String> {
        self.processors.list_names()
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Validate and register a workflow definition under its name.
    pub fn load_workflow(&mut self, workflow: WorkflowDefinition) -> Result<(), ConfigError> {
        if let Err(errors) = self.validate_workflow(&workflow) {
            return Err(ConfigError::InvalidWorkflow {
                name: workflow.name.clone(),
                errors,
            });
        }
        self.workflows
            .insert(workflow.name.clone(), Arc::new(workflow));
        Ok(())
    }

    pub fn get_workflow(&self, name: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(name).cloned()
    }

    pub fn available_workflows(&self) -> Vec<String> {
        self.workflows.keys().cloned().collect()
    }

    /// Check `workflow` against the registered components.
    pub fn validate_workflow(&self, workflow: &WorkflowDefinition) -> Result<(), Vec<String>> {
        let errors = self.workflow_errors(workflow);
        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn validate_workflow_ok(&self, workflow: &WorkflowDefinition) -> bool {
        self.validate_workflow(workflow).is_ok()
    }

    /// Structural problems with `workflow`: unresolved data source and
    /// processor references, malformed conditions, bad output keys and zero
    /// timeouts.
    pub fn workflow_errors(&self, workflow: &WorkflowDefinition) -> Vec<String> {
        let mut errors = Vec::new();

        if workflow.name.trim().is_empty() {
            errors.push("workflow name must not be empty".to_string());
        }
        if workflow.global_timeout == 0 {
            errors.push("global_timeout must be greater than zero".to_string());
        }

        for (i, step) in workflow.steps.iter().enumerate() {
            let step_label = if step.name.is_empty() {
                errors.push(format!("step {i} has no name"));
                format!("#{i}")
            } else {
                step.name.clone()
            };

            if let Some(cond) = &step.condition {
                if let Err(e) = condition::parse(cond) {
                    errors.push(format!("step '{step_label}': {e}"));
                }
            }

            let mut output_keys = BTreeSet::new();
            for op in &step.operations {
                self.operation_errors(&step_label, op, &mut errors);
                if !output_keys.insert(op.output_key().to_string()) {
                    errors.push(format!(
                        "step '{step_label}': duplicate output key '{}'",
                        op.output_key()
                    ));
                }
            }
        }

        errors
    }

    fn operation_errors(&self, step: &str, op: &OperationDefinition, errors: &mut Vec<String>) {
        let label = format!("step '{step}', operation '{}'", op.name);

        if op.name.trim().is_empty() {
            errors.push(format!("step '{step}': operation has no name"));
        }
        if op.timeout_seconds == Some(0) {
            errors.push(format!("{label}: timeout_seconds must be greater than zero"));
        }

        let key = op.output_key();
        if key.is_empty() || key.chars().any(char::is_whitespace) || key.contains("${") {
            errors.push(format!("{label}: invalid output key '{key}'"));
        }

        match op.op_type {
            OperationType::EndpointCall => match op.data_source.as_deref() {
                None => errors.push(format!("{label}: endpoint_call requires a data_source")),
                Some(ds) if !self.data_sources.contains(ds) => {
                    errors.push(format!("{label}: unknown data source '{ds}'"))
                }
                Some(_) => {}
            },
            OperationType::CustomProcessor => match op.processor.as_deref() {
                None => errors.push(format!("{label}: custom_processor requires a processor")),
                Some(p) if !self.processors.contains(p) => {
                    errors.push(format!("{label}: unknown processor '{p}'"))
                }
                Some(_) => {}
            },
            OperationType::Merge | OperationType::Filter | OperationType::Transform => {}
        }

        if let Some(cond) = &op.condition {
            if let Err(e) = condition::parse(cond) {
                errors.push(format!("{label}: {e}"));
            }
        }

        if let Some(ds) = op
            .fallback_config
            .as_ref()
            .and_then(|f| f.data_source.as_deref())
        {
            if !self.data_sources.contains(ds) {
                errors.push(format!("{label}: unknown fallback data source '{ds}'"));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Parameters
    // -----------------------------------------------------------------------

    /// Install validation rules for an endpoint, compiling their patterns.
    pub fn set_validation_rules(
        &mut self,
        endpoint: &str,
        rules: BTreeMap<String, ValidationRule>,
    ) -> Result<(), ConfigError> {
        for (field, rule) in &rules {
            let Some(pattern) = &rule.pattern else {
                continue;
            };
            if self.patterns.contains_key(pattern) {
                continue;
            }
            let re = Regex::new(pattern).map_err(|e| ConfigError::InvalidPattern {
                endpoint: endpoint.to_string(),
                field: field.clone(),
                pattern: pattern.clone(),
                reason: e.to_string(),
            })?;
            self.patterns.insert(pattern.clone(), re);
        }
        self.validation_rules.insert(endpoint.to_string(), rules);
        Ok(())
    }

    pub fn set_parameter_template(&mut self, endpoint: &str, template: ParameterTemplate) {
        self.parameter_templates
            .insert(endpoint.to_string(), template);
    }

    pub fn set_variable(&mut self, name: &str, value: Value) {
        self.variables.insert(name.to_string(), value);
    }

    /// Configuration variables rendered for `${CONFIG:NAME}` lookups.
    pub fn template_variables(&self) -> HashMap<String, String> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), value_to_string(v)))
            .collect()
    }

    fn template_context(&self, params: &Map<String, Value>) -> HashMap<String, String> {
        let mut ctx = self.template_variables();
        for (k, v) in params {
            ctx.insert(k.clone(), value_to_string(v));
        }
        ctx
    }

    /// Rename aliased fields and map aliased values to canonical ones.
    /// Template defaults are not applied.
    pub fn alias_parameters(&self, endpoint: &str, input: &Value) -> Value {
        let Value::Object(input_map) = input else {
            return input.clone();
        };
        let empty = ParameterTemplate::default();
        let template = self.parameter_templates.get(endpoint).unwrap_or(&empty);

        let mut params = Map::new();
        for (key, value) in input_map {
            let canonical = template.aliases.get(key).unwrap_or(key);
            if canonical != key && input_map.contains_key(canonical) {
                continue;
            }
            params.insert(canonical.clone(), value.clone());
        }

        for (field, aliases) in &template.value_aliases {
            let field = template.aliases.get(field).unwrap_or(field);
            if let Some(value) = params.get_mut(field) {
                apply_value_aliases(value, aliases);
            }
        }
        Value::Object(params)
    }

    /// Normalise caller parameters for `endpoint`: rename aliased fields,
    /// map aliased values to canonical ones, fill template defaults and
    /// resolve placeholders.
    pub fn resolve_parameters(&self, endpoint: &str, input: &Value) -> Value {
        let Value::Object(mut params) = self.alias_parameters(endpoint, input) else {
            return input.clone();
        };
        let empty = ParameterTemplate::default();
        let template = self.parameter_templates.get(endpoint).unwrap_or(&empty);

        let ctx = self.template_context(&params);
        for (key, default) in &template.parameters {
            if params.get(key).is_none_or(Value::is_null) {
                let resolved = template::resolve_value(default, &ctx, &|_: &str| None);
                params.insert(key.clone(), coerce_scalar(default, resolved));
            }
        }

        let resolved = Value::Object(params);
        let lookup = |key: &str| resolved.get(key).cloned();
        template::resolve_value(&resolved, &ctx, &lookup)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn is_broad_search_endpoint(&self, endpoint: &str) -> bool {
        self.broad_search_endpoints.contains(endpoint)
    }

    pub fn validate_request(&self, endpoint: &str, parameters: &Value) -> bool {
        self.get_validation_errors(endpoint, parameters).is_empty()
    }

    /// Every rule violation for `parameters`, as human-readable messages.
    ///
    /// Broad-search endpoints report the guard violation first; a missing
    /// parameters object is reported alone.
    pub fn get_validation_errors(&self, endpoint: &str, parameters: &Value) -> Vec<String> {
        self.request_errors(endpoint, parameters, parameters)
    }

    /// Validate a caller request. The broad-search guard sees the caller's
    /// own parameters (after alias renaming) so template defaults cannot
    /// satisfy it; field rules see the fully resolved parameters.
    pub fn request_errors(&self, endpoint: &str, supplied: &Value, parameters: &Value) -> Vec<String> {
        let mut errors = Vec::new();

        if self.is_broad_search_endpoint(endpoint) {
            if let Some(e) = broad_search_error(endpoint, supplied) {
                errors.push(e);
                if !supplied.is_object() {
                    return errors;
                }
            }
        }

        if let Some(rules) = self.validation_rules.get(endpoint) {
            let empty = Map::new();
            let params = parameters.as_object().unwrap_or(&empty);
            for (field, rule) in rules {
                let pattern = rule.pattern.as_ref().and_then(|p| self.patterns.get(p));
                errors.extend(validate_field(field, params.get(field), rule, pattern));
            }
        }

        errors
    }
}

fn apply_value_aliases(value: &mut Value, aliases: &BTreeMap<String, String>) {
    match value {
        Value::String(s) => {
            if let Some(canonical) = aliases.get(s.as_str()) {
                *s = canonical.clone();
            }
        }
        Value::Array(items) => {
            for item in items {
                apply_value_aliases(item, aliases);
            }
        }
        _ => {}
    }
}

/// A default written as a placeholder (`"${CONFIG:limit|50}"`) that
/// resolves to a number or boolean is stored as that scalar.
fn coerce_scalar(template: &Value, resolved: Value) -> Value {
    let (Value::String(t), Value::String(s)) = (template, &resolved) else {
        return resolved;
    };
    if !is_template_string(t) {
        return resolved;
    }
    if let Ok(i) = s.parse::<i64>() {
        return Value::from(i);
    }
    if let Ok(f) = s.parse::<f64>() {
        if let Some(n) = serde_json::Number::from_f64(f) {
            return Value::Number(n);
        }
    }
    match s.as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => resolved,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockFactory, MockSource};
    use serde_json::json;

    fn sample_config() -> Value {
        json!({
            "data_sources": {
                "ncbi_api": {"type": "mock"},
                "pubmed_cache": {"type": "mock", "response": []}
            },
            "processors": {
                "vcf": {"type": "vcf_annotator"}
            },
            "variables": {"default_confidence_level": "medium", "default_limit": 25},
            "parameter_templates": {
                "getMentalHealthGenes": {
                    "parameters": {
                        "limit": "${CONFIG:default_limit|50}",
                        "confidence": "${CONFIG:default_confidence_level|low}"
                    },
                    "aliases": {"genes": "gene_ids", "confidence_level": "confidence"},
                    "value_aliases": {"confidence": {"strong": "high", "weak": "low"}}
                }
            },
            "validation_rules": {
                "getMentalHealthGenes": {
                    "condition": {"required": true, "type": "string"},
                    "confidence": {"allowed": ["high", "medium", "low"]},
                    "gene_ids": {"type": "array", "pattern": "^[A-Za-z0-9]+$"}
                }
            },
            "workflows": {
                "quick_gene_lookup": {
                    "steps": [{
                        "name": "lookup",
                        "operations": [{
                            "name": "gene_info",
                            "data_source": "ncbi_api",
                            "endpoint": "getGeneInfo",
                            "parameters": {"genes": "${INPUT:genes}"}
                        }]
                    }]
                }
            }
        })
    }

    fn loaded() -> ConfigurationManager {
        let mut manager = ConfigurationManager::new();
        manager
            .load_configuration_from_value(sample_config(), &MockFactory)
            .unwrap();
        manager
    }

    #[test]
    fn test_new_registers_builtin_processors() {
        let manager = ConfigurationManager::new();
        assert_eq!(
            manager.available_processors(),
            vec!["expression_normalizer", "vcf_annotator"]
        );
        assert!(manager.available_data_sources().is_empty());
        assert!(manager.is_broad_search_endpoint("getDrugGeneInteractions"));
    }

    #[test]
    fn test_load_populates_registries() {
        let manager = loaded();
        assert_eq!(manager.available_data_sources(), vec!["ncbi_api", "pubmed_cache"]);
        assert!(manager.get_processor("vcf").is_some());
        assert_eq!(manager.available_workflows(), vec!["quick_gene_lookup"]);
        let wf = manager.get_workflow("quick_gene_lookup").unwrap();
        assert_eq!(wf.steps[0].operations[0].endpoint_name(), "getGeneInfo");
    }

    #[test]
    fn test_load_rejects_unknown_source_type_and_keeps_state() {
        let mut manager = loaded();
        let err = manager
            .load_configuration_from_value(
                json!({"data_sources": {"bad": {"type": "ftp"}}}),
                &MockFactory,
            )
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::UnknownSourceType { kind, .. } if kind == "ftp"),
            "got: {err:?}"
        );
        assert_eq!(manager.available_data_sources(), vec!["ncbi_api", "pubmed_cache"]);
    }

    #[test]
    fn test_load_rejects_unknown_processor_type() {
        let mut manager = ConfigurationManager::new();
        let err = manager
            .load_configuration_from_value(
                json!({"processors": {"p": {"type": "image_resizer"}}}),
                &MockFactory,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownProcessorType { .. }));
    }

    #[test]
    fn test_load_rejects_structural_errors() {
        let mut manager = ConfigurationManager::new();
        let err = manager
            .load_configuration_from_json("{not json", &MockFactory)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));

        let err = manager
            .load_configuration_from_value(json!({"workflows": 7}), &MockFactory)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_rejects_invalid_pattern() {
        let mut manager = ConfigurationManager::new();
        let err = manager
            .load_configuration_from_value(
                json!({"validation_rules": {"e": {"f": {"pattern": "(unclosed"}}}}),
                &MockFactory,
            )
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }), "got: {err:?}");
    }

    #[test]
    fn test_load_rejects_workflow_with_unknown_source() {
        let mut manager = ConfigurationManager::new();
        let err = manager
            .load_configuration_from_value(
                json!({"workflows": [{
                    "name": "wf",
                    "steps": [{"name": "s", "operations": [{"name": "op", "data_source": "ghost"}]}]
                }]}),
                &MockFactory,
            )
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("unknown data source 'ghost'"), "got: {msg}");
    }

    #[test]
    fn test_register_last_wins() {
        let mut manager = ConfigurationManager::new();
        assert!(!manager.register_data_source("src", BoxDataSource::new(MockSource::echo("a"))));
        assert!(manager.register_data_source("src", BoxDataSource::new(MockSource::failing("b"))));
        assert_eq!(manager.get_data_source("src").unwrap().name(), "b");
    }

    #[test]
    fn test_resolve_parameters_aliases_and_defaults() {
        let manager = loaded();
        let resolved = manager.resolve_parameters(
            "getMentalHealthGenes",
            &json!({
                "genes": ["COMT", "1312", "ENSG00000196569"],
                "condition": "depression",
                "confidence": "strong"
            }),
        );
        assert_eq!(
            resolved,
            json!({
                "gene_ids": ["COMT", "1312", "ENSG00000196569"],
                "condition": "depression",
                "confidence": "high",
                "limit": 25
            })
        );
        assert!(manager.validate_request("getMentalHealthGenes", &resolved));
    }

    #[test]
    fn test_resolve_parameters_alias_field_with_value_alias() {
        let manager = loaded();
        let resolved = manager.resolve_parameters(
            "getMentalHealthGenes",
            &json!({"condition": "anxiety", "confidence_level": "weak"}),
        );
        assert_eq!(resolved["confidence"], "low");
        assert!(resolved.get("confidence_level").is_none());
    }

    #[test]
    fn test_resolve_parameters_default_from_config() {
        let manager = loaded();
        let resolved =
            manager.resolve_parameters("getMentalHealthGenes", &json!({"condition": "x"}));
        assert_eq!(resolved["confidence"], "medium");
    }

    #[test]
    fn test_resolve_parameters_without_template_resolves_placeholders() {
        let manager = loaded();
        let resolved = manager.resolve_parameters(
            "other",
            &json!({"limit": "${CONFIG:default_limit}", "q": "${CONFIG:nope|fallback}"}),
        );
        assert_eq!(resolved, json!({"limit": "25", "q": "fallback"}));
    }

    #[test]
    fn test_validation_errors_for_rules() {
        let manager = loaded();
        let errors = manager.get_validation_errors(
            "getMentalHealthGenes",
            &json!({"confidence": "invalid_level", "gene_ids": ["COMT", "bad id"]}),
        );
        assert_eq!(errors.len(), 3, "got: {errors:?}");
        assert!(errors.iter().any(|e| e.contains("Missing required parameter 'condition'")));
        assert!(errors.iter().any(|e| e.contains("'invalid_level'")));
        assert!(errors.iter().any(|e| e.contains("'bad id'")));
    }

    #[test]
    fn test_broad_search_validation() {
        let manager = ConfigurationManager::new();
        let errors = manager.get_validation_errors("getResearchAssociations", &Value::Null);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Missing parameters object"));

        assert!(!manager.validate_request("getResearchAssociations", &json!({})));
        assert!(!manager.validate_request("getPolygeneticRiskScores", &json!({"trait": ""})));
        assert!(manager.validate_request("getResearchAssociations", &json!({"gene_ids": ["COMT"]})));
    }

    #[test]
    fn test_non_broad_endpoints_accept_anything() {
        let manager = ConfigurationManager::new();
        for params in [json!({}), json!(null), json!({"a": null}), json!([])] {
            assert!(manager.validate_request("getGeneInfo", &params), "params: {params}");
        }
    }

    #[test]
    fn test_configured_broad_search_endpoints_replace_defaults() {
        let mut manager = ConfigurationManager::new();
        manager
            .load_configuration_from_value(
                json!({"broad_search_endpoints": ["searchAll"]}),
                &MockFactory,
            )
            .unwrap();
        assert!(manager.is_broad_search_endpoint("searchAll"));
        assert!(!manager.is_broad_search_endpoint("getResearchAssociations"));
    }

    #[test]
    fn test_workflow_errors() {
        let manager = loaded();
        let wf: WorkflowDefinition = serde_json::from_value(json!({
            "name": "broken",
            "global_timeout": 0,
            "steps": [{
                "name": "s",
                "condition": "a = 1",
                "operations": [
                    {"name": "a", "type": "custom_processor"},
                    {"name": "b", "data_source": "ncbi_api", "output_key": "out"},
                    {"name": "c", "data_source": "ncbi_api", "output_key": "out",
                     "fallback_config": {"data_source": "ghost"}},
                    {"name": "d", "type": "merge", "output_key": "bad key", "timeout_seconds": 0}
                ]
            }]
        }))
        .unwrap();
        let errors = manager.workflow_errors(&wf);
        let joined = errors.join("\n");
        for expected in [
            "global_timeout must be greater than zero",
            "malformed condition",
            "custom_processor requires a processor",
            "duplicate output key 'out'",
            "unknown fallback data source 'ghost'",
            "invalid output key 'bad key'",
            "timeout_seconds must be greater than zero",
        ] {
            assert!(joined.contains(expected), "missing {expected:?} in:\n{joined}");
        }
        assert!(!manager.validate_workflow_ok(&wf));

        let ok = manager.get_workflow("quick_gene_lookup").unwrap();
        assert!(manager.validate_workflow(&ok).is_ok());
    }
}
