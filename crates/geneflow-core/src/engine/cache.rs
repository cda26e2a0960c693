//! In-process operation cache shared by every run of one engine.

use std::sync::Arc;

use dashmap::DashMap;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::value::canonical_json;

/// Concurrent key/value store for operation results. Clones share storage.
#[derive(Debug, Clone, Default)]
pub struct OperationCache {
    entries: Arc<DashMap<String, Value>>,
}

impl OperationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.entries.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn clear(&self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// SHA-256 hex of `name \0 target \0 canonical(parameters)`.
pub fn cache_key(name: &str, target: &str, parameters: &Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    hasher.update([0u8]);
    hasher.update(target.as_bytes());
    hasher.update([0u8]);
    hasher.update(canonical_json(parameters).as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_key_ignores_object_key_order() {
        let a = cache_key("op", "src", &json!({"a": 1, "b": {"x": 1, "y": 2}}));
        let b = cache_key("op", "src", &json!({"b": {"y": 2, "x": 1}, "a": 1}));
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_key_separates_fields() {
        let params = json!({});
        assert_ne!(cache_key("ab", "c", &params), cache_key("a", "bc", &params));
        assert_ne!(cache_key("op", "src", &params), cache_key("op", "src", &json!({"a": 1})));
    }

    #[test]
    fn test_shared_storage() {
        let cache = OperationCache::new();
        let clone = cache.clone();
        clone.set("k", json!([1, 2]));
        assert!(cache.has("k"));
        assert_eq!(cache.get("k"), Some(json!([1, 2])));
        cache.clear();
        assert!(clone.is_empty());
    }
}
