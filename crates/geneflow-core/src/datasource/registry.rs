//! Name-indexed registry of boxed data sources.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::box_source::BoxDataSource;

/// Registry of data sources, indexed by name.
///
/// Entries are `Arc`ed so in-flight operations keep their source alive and
/// the registry can be cloned cheaply when staging a new configuration.
#[derive(Clone, Default)]
pub struct DataSourceRegistry {
    sources: BTreeMap<String, Arc<BoxDataSource>>,
}

impl DataSourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under the given name.
    ///
    /// If a source with this name already exists it is replaced; returns
    /// `true` in that case.
    pub fn register(&mut self, name: impl Into<String>, source: BoxDataSource) -> bool {
        self.sources.insert(name.into(), Arc::new(source)).is_some()
    }

    pub fn get(&self, name: &str) -> Option<Arc<BoxDataSource>> {
        self.sources.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sources.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn list_names(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<BoxDataSource>)> {
        self.sources.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
