//! Data processors: pluggable transforms applied to retrieved data.

pub mod expression;
pub mod vcf;

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

pub use expression::ExpressionNormalizerProcessor;
pub use vcf::VcfAnnotationProcessor;

/// Failures reported by a processor.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    #[error("{processor}: invalid input: {reason}")]
    InvalidInput { processor: String, reason: String },

    #[error("{processor}: invalid config: {reason}")]
    InvalidConfig { processor: String, reason: String },
}

/// A synchronous transform over structured values.
pub trait DataProcessor: Send + Sync {
    /// Processor kind (e.g. "vcf_annotator").
    fn processor_type(&self) -> &str;

    fn process(&self, input: &Value, config: &Value) -> Result<Value, ProcessorError>;
}

pub type BoxDataProcessor = Box<dyn DataProcessor>;

/// Build one of the processors shipped with the engine by type name.
pub fn builtin_processor(kind: &str) -> Option<BoxDataProcessor> {
    match kind {
        "vcf_annotator" => Some(Box::new(VcfAnnotationProcessor)),
        "expression_normalizer" => Some(Box::new(ExpressionNormalizerProcessor)),
        _ => None,
    }
}

/// Type names accepted by [`builtin_processor`].
pub const BUILTIN_PROCESSOR_TYPES: [&str; 2] = ["vcf_annotator", "expression_normalizer"];

/// Registry of processors, indexed by name. Last registration wins.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    processors: BTreeMap<String, Arc<dyn DataProcessor>>,
}

impl ProcessorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register under `name`, returning `true` if an entry was replaced.
    pub fn register(&mut self, name: impl Into<String>, processor: BoxDataProcessor) -> bool {
        self.processors
            .insert(name.into(), Arc::from(processor))
            .is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn DataProcessor>> {
        self.processors.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.processors.contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.processors.keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_processor_lookup() {
        for kind in BUILTIN_PROCESSOR_TYPES {
            let p = builtin_processor(kind).unwrap();
            assert_eq!(p.processor_type(), kind);
        }
        assert!(builtin_processor("unknown").is_none());
    }

    #[test]
    fn test_registry_last_registration_wins() {
        let mut registry = ProcessorRegistry::new();
        assert!(!registry.register("p", Box::new(VcfAnnotationProcessor)));
        assert!(registry.register("p", Box::new(ExpressionNormalizerProcessor)));
        assert_eq!(
            registry.get("p").unwrap().processor_type(),
            "expression_normalizer"
        );
        assert_eq!(registry.list_names(), vec!["p"]);
    }
}
