//! Test doubles shared by the core test modules.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::{Value, json};

use geneflow_types::source::ComponentDefinition;

use crate::config::{ComponentFactory, ConfigError};
use crate::datasource::{BoxDataSource, DataSource, DataSourceError};

/// In-memory data source that counts dispatches.
///
/// Returns `response`, or echoes `{operation, parameters}` when `response`
/// is null.
pub struct MockSource {
    pub name: String,
    pub response: Value,
    pub fail: bool,
    pub delay: Option<Duration>,
    pub calls: Arc<AtomicUsize>,
    /// Dispatches that ran to completion, counted after the delay.
    pub completed: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn echo(name: &str) -> Self {
        Self {
            name: name.to_string(),
            response: Value::Null,
            fail: false,
            delay: None,
            calls: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn returning(name: &str, response: Value) -> Self {
        Self {
            response,
            ..Self::echo(name)
        }
    }

    pub fn failing(name: &str) -> Self {
        Self {
            fail: true,
            ..Self::echo(name)
        }
    }

    pub fn slow(name: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::echo(name)
        }
    }

    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }

    pub fn completions(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.completed)
    }
}

impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_type(&self) -> &str {
        "mock"
    }

    async fn execute(&self, operation: &str, parameters: &Value) -> Result<Value, DataSourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(DataSourceError::Execution {
                source_name: self.name.clone(),
                operation: operation.to_string(),
                reason: "mock failure".to_string(),
            });
        }
        if self.response.is_null() {
            Ok(json!({"operation": operation, "parameters": parameters}))
        } else {
            Ok(self.response.clone())
        }
    }

    async fn is_available(&self) -> bool {
        !self.fail
    }

    fn connection_info(&self) -> Value {
        json!({"type": "mock", "name": self.name})
    }
}

/// Factory that understands `{"type": "mock", "response": ..., "fail": bool}`.
pub struct MockFactory;

impl ComponentFactory for MockFactory {
    fn create_data_source(
        &self,
        name: &str,
        definition: &ComponentDefinition,
    ) -> Result<BoxDataSource, ConfigError> {
        if definition.kind != "mock" {
            return Err(ConfigError::UnknownSourceType {
                name: name.to_string(),
                kind: definition.kind.clone(),
            });
        }
        let mut source = MockSource::echo(name);
        if let Some(response) = definition.config.get("response") {
            source.response = response.clone();
        }
        source.fail = definition
            .config
            .get("fail")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        Ok(BoxDataSource::new(source))
    }
}
