//! Persistent cache data source: one JSON file per entry under
//! `cache_path`, expired by TTL and capped in total size.
//!
//! Operations:
//! - `get {key | operation, parameters}` -- a miss is an `Execution` error
//! - `set {key | operation, parameters, value}`
//! - `delete {key | operation, parameters}`
//! - `cleanup` -- remove expired entries
//! - `clear` -- remove every entry

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::Utc;
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use geneflow_core::datasource::{DataSource, DataSourceError};
use geneflow_core::value::canonical_json;

const ENTRY_EXTENSION: &str = "json";

/// `{type: "cache", ...}` configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheSourceConfig {
    pub cache_path: PathBuf,
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_max_size_bytes")]
    pub max_size_bytes: u64,
}

fn default_ttl_seconds() -> u64 {
    3600
}

fn default_max_size_bytes() -> u64 {
    100 * 1024 * 1024
}

struct EntryFile {
    path: PathBuf,
    size: u64,
    modified: SystemTime,
}

pub struct CacheDataSource {
    name: String,
    config: CacheSourceConfig,
}

impl CacheDataSource {
    pub fn new(name: impl Into<String>, config: CacheSourceConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Entry key: an explicit `key`, or the SHA-256 hex of `operation`, a
    /// NUL separator and the canonical form of `parameters`.
    pub fn entry_key(operation: &str, params: &Value) -> Result<String, DataSourceError> {
        if let Some(key) = params.get("key").and_then(Value::as_str) {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
            if !valid {
                return Err(DataSourceError::InvalidParameters {
                    operation: operation.to_string(),
                    reason: format!("invalid cache key '{key}'"),
                });
            }
            return Ok(key.to_string());
        }

        let target = params
            .get("operation")
            .and_then(Value::as_str)
            .ok_or_else(|| DataSourceError::InvalidParameters {
                operation: operation.to_string(),
                reason: "expected 'key' or 'operation'".to_string(),
            })?;
        let parameters = params.get("parameters").unwrap_or(&Value::Null);

        let mut hasher = Sha256::new();
        hasher.update(target.as_bytes());
        hasher.update(b"\0");
        hasher.update(canonical_json(parameters).as_bytes());
        Ok(hasher
            .finalize()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.config
            .cache_path
            .join(format!("{key}.{ENTRY_EXTENSION}"))
    }

    fn execution(&self, operation: &str, reason: impl ToString) -> DataSourceError {
        DataSourceError::Execution {
            source_name: self.name.clone(),
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Whether the entry at `path` is younger than the TTL.
    pub async fn is_cache_valid(&self, path: &Path) -> bool {
        let Ok(metadata) = tokio::fs::metadata(path).await else {
            return false;
        };
        metadata
            .modified()
            .is_ok_and(|m| is_fresh(m, self.config.ttl_seconds))
    }

    async fn entries(&self) -> Result<Vec<EntryFile>, std::io::Error> {
        let mut files = Vec::new();
        let mut dir = match tokio::fs::read_dir(&self.config.cache_path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(e),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            files.push(EntryFile {
                path,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        Ok(files)
    }

    /// Remove every entry older than the TTL. Returns how many were removed.
    pub async fn cleanup_expired_entries(&self) -> Result<usize, std::io::Error> {
        let mut removed = 0;
        for entry in self.entries().await? {
            if !is_fresh(entry.modified, self.config.ttl_seconds) {
                tokio::fs::remove_file(&entry.path).await?;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(source = %self.name, removed, "expired cache entries removed");
        }
        Ok(removed)
    }

    /// Drop expired entries, then the oldest ones until the total size is
    /// within `max_size_bytes`.
    async fn enforce_size_limit(&self) -> Result<usize, std::io::Error> {
        let mut entries = self.entries().await?;
        let mut total: u64 = entries.iter().map(|e| e.size).sum();
        if total <= self.config.max_size_bytes {
            return Ok(0);
        }

        let mut evicted = self.cleanup_expired_entries().await?;
        entries = self.entries().await?;
        total = entries.iter().map(|e| e.size).sum();
        entries.sort_by_key(|e| e.modified);

        for entry in entries {
            if total <= self.config.max_size_bytes {
                break;
            }
            tokio::fs::remove_file(&entry.path).await?;
            total = total.saturating_sub(entry.size);
            evicted += 1;
        }
        tracing::debug!(source = %self.name, evicted, "cache size limit enforced");
        Ok(evicted)
    }

    async fn get(&self, params: &Value) -> Result<Value, DataSourceError> {
        let key = Self::entry_key("get", params)?;
        let path = self.entry_path(&key);
        if !self.is_cache_valid(&path).await {
            if tokio::fs::try_exists(&path).await.unwrap_or(false) {
                let _ = tokio::fs::remove_file(&path).await;
            }
            return Err(self.execution("get", "cache miss"));
        }

        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| self.execution("get", "cache miss"))?;
        let entry: Value =
            serde_json::from_str(&text).map_err(|e| self.execution("get", format!("corrupt entry: {e}")))?;
        Ok(entry.get("value").cloned().unwrap_or(Value::Null))
    }

    async fn set(&self, params: &Value) -> Result<Value, DataSourceError> {
        let key = Self::entry_key("set", params)?;
        let value = params.get("value").ok_or_else(|| DataSourceError::InvalidParameters {
            operation: "set".to_string(),
            reason: "missing 'value'".to_string(),
        })?;

        tokio::fs::create_dir_all(&self.config.cache_path)
            .await
            .map_err(|e| self.execution("set", e))?;
        let entry = json!({"created_at": Utc::now().to_rfc3339(), "value": value});
        tokio::fs::write(self.entry_path(&key), entry.to_string())
            .await
            .map_err(|e| self.execution("set", e))?;

        let evicted = self
            .enforce_size_limit()
            .await
            .map_err(|e| self.execution("set", e))?;
        Ok(json!({"key": key, "stored": true, "evicted": evicted}))
    }

    async fn delete(&self, params: &Value) -> Result<Value, DataSourceError> {
        let key = Self::entry_key("delete", params)?;
        let deleted = match tokio::fs::remove_file(self.entry_path(&key)).await {
            Ok(()) => true,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
            Err(e) => return Err(self.execution("delete", e)),
        };
        Ok(json!({"key": key, "deleted": deleted}))
    }

    async fn clear(&self) -> Result<Value, DataSourceError> {
        let entries = self.entries().await.map_err(|e| self.execution("clear", e))?;
        let removed = entries.len();
        for entry in entries {
            tokio::fs::remove_file(&entry.path)
                .await
                .map_err(|e| self.execution("clear", e))?;
        }
        Ok(json!({"removed": removed}))
    }
}

fn is_fresh(modified: SystemTime, ttl_seconds: u64) -> bool {
    ttl_seconds > 0
        && SystemTime::now()
            .duration_since(modified)
            .map(|age| age < Duration::from_secs(ttl_seconds))
            .unwrap_or(true)
}

impl DataSource for CacheDataSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        "cache"
    }

    async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
        match operation {
            "get" => self.get(parameters).await,
            "set" => self.set(parameters).await,
            "delete" => self.delete(parameters).await,
            "cleanup" => {
                let removed = self
                    .cleanup_expired_entries()
                    .await
                    .map_err(|e| self.execution(operation, e))?;
                Ok(json!({"removed": removed}))
            }
            "clear" => self.clear().await,
            _ => Err(DataSourceError::Unsupported {
                source_name: self.name.clone(),
                operation: operation.to_string(),
            }),
        }
    }

    async fn is_available(&self) -> bool {
        tokio::fs::create_dir_all(&self.config.cache_path).await.is_ok()
    }

    fn connection_info(&self) -> Value {
        json!({
            "type": "cache",
            "name": self.name,
            "cache_path": self.config.cache_path.display().to_string(),
            "ttl_seconds": self.config.ttl_seconds,
            "max_size_bytes": self.config.max_size_bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cache(dir: &TempDir, ttl_seconds: u64, max_size_bytes: u64) -> CacheDataSource {
        CacheDataSource::new(
            "disk_cache",
            CacheSourceConfig {
                cache_path: dir.path().join("entries"),
                ttl_seconds,
                max_size_bytes,
            },
        )
    }

    #[tokio::test]
    async fn test_set_get_delete_by_key() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 3600, default_max_size_bytes());

        let err = cache.execute("get", &json!({"key": "genes"})).await.unwrap_err();
        assert!(err.to_string().contains("cache miss"), "got: {err}");

        cache
            .execute("set", &json!({"key": "genes", "value": ["COMT"]}))
            .await
            .unwrap();
        assert_eq!(
            cache.execute("get", &json!({"key": "genes"})).await.unwrap(),
            json!(["COMT"])
        );

        let deleted = cache.execute("delete", &json!({"key": "genes"})).await.unwrap();
        assert_eq!(deleted["deleted"], true);
        assert!(cache.execute("get", &json!({"key": "genes"})).await.is_err());
    }

    #[tokio::test]
    async fn test_derived_key_ignores_parameter_order() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 3600, default_max_size_bytes());
        cache
            .execute(
                "set",
                &json!({"operation": "getGeneInfo", "parameters": {"a": 1, "b": 2}, "value": 7}),
            )
            .await
            .unwrap();
        let hit = cache
            .execute(
                "get",
                &json!({"operation": "getGeneInfo", "parameters": {"b": 2, "a": 1}}),
            )
            .await
            .unwrap();
        assert_eq!(hit, json!(7));
    }

    #[test]
    fn test_derived_key_separates_operation_from_parameters() {
        let shifted = CacheDataSource::entry_key("get", &json!({"operation": "x1", "parameters": 2}))
            .unwrap();
        let other = CacheDataSource::entry_key("get", &json!({"operation": "x", "parameters": 12}))
            .unwrap();
        assert_ne!(shifted, other);
    }

    #[tokio::test]
    async fn test_expired_entries_miss_and_cleanup() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 0, default_max_size_bytes());
        cache
            .execute("set", &json!({"key": "k1", "value": 1}))
            .await
            .unwrap();
        assert!(cache.execute("get", &json!({"key": "k1"})).await.is_err());

        cache
            .execute("set", &json!({"key": "k2", "value": 2}))
            .await
            .unwrap();
        let cleaned = cache.execute("cleanup", &json!({})).await.unwrap();
        assert_eq!(cleaned, json!({"removed": 1}));
    }

    #[tokio::test]
    async fn test_size_limit_evicts_oldest() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 3600, 150);
        let payload = "x".repeat(60);
        for key in ["first", "second", "third"] {
            cache
                .execute("set", &json!({"key": key, "value": payload}))
                .await
                .unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(cache.execute("get", &json!({"key": "first"})).await.is_err());
        assert!(cache.execute("get", &json!({"key": "third"})).await.is_ok());
    }

    #[tokio::test]
    async fn test_clear_and_invalid_keys() {
        let dir = TempDir::new().unwrap();
        let cache = cache(&dir, 3600, default_max_size_bytes());
        for key in ["a", "b"] {
            cache
                .execute("set", &json!({"key": key, "value": null}))
                .await
                .unwrap();
        }
        assert_eq!(
            cache.execute("clear", &json!({})).await.unwrap(),
            json!({"removed": 2})
        );

        let err = cache
            .execute("get", &json!({"key": "../escape"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidParameters { .. }));
        let err = cache.execute("get", &json!({})).await.unwrap_err();
        assert!(matches!(err, DataSourceError::InvalidParameters { .. }));
    }
}
