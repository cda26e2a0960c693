//! BoxDataSource -- object-safe dynamic dispatch wrapper for DataSource.
//!
//! 1. Define an object-safe `DataSourceDyn` trait with boxed futures
//! 2. Blanket-impl `DataSourceDyn` for all `T: DataSource`
//! 3. `BoxDataSource` wraps `Box<dyn DataSourceDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use super::source::{DataSource, DataSourceError};

/// Object-safe version of [`DataSource`] with boxed futures.
pub trait DataSourceDyn: Send + Sync {
    fn name(&self) -> &str;

    fn source_type(&self) -> &str;

    fn execute_boxed<'a>(
        &'a self,
        operation: &'a str,
        parameters: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DataSourceError>> + Send + 'a>>;

    fn is_available_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    fn health_check_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>>;

    fn connection_info(&self) -> Value;
}

impl<T: DataSource> DataSourceDyn for T {
    fn name(&self) -> &str {
        DataSource::name(self)
    }

    fn source_type(&self) -> &str {
        DataSource::source_type(self)
    }

    fn execute_boxed<'a>(
        &'a self,
        operation: &'a str,
        parameters: &'a Value,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DataSourceError>> + Send + 'a>> {
        Box::pin(self.execute(operation, parameters))
    }

    fn is_available_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(self.is_available())
    }

    fn health_check_boxed(&self) -> Pin<Box<dyn Future<Output = bool> + Send + '_>> {
        Box::pin(self.health_check())
    }

    fn connection_info(&self) -> Value {
        DataSource::connection_info(self)
    }
}

/// Type-erased data source for the runtime registry.
///
/// Since `DataSource` uses RPITIT it cannot be a trait object directly;
/// `BoxDataSource` exposes the same methods and delegates to the inner
/// `DataSourceDyn` trait object.
pub struct BoxDataSource {
    inner: Box<dyn DataSourceDyn + Send + Sync>,
}

impl BoxDataSource {
    pub fn new<T: DataSource + 'static>(source: T) -> Self {
        Self {
            inner: Box::new(source),
        }
    }

    pub fn name(&self) -> &str {
        self.inner.name()
    }

    pub fn source_type(&self) -> &str {
        self.inner.source_type()
    }

    pub async fn execute(
        &self,
        operation: &str,
        parameters: &Value,
    ) -> Result<Value, DataSourceError> {
        self.inner.execute_boxed(operation, parameters).await
    }

    pub async fn is_available(&self) -> bool {
        self.inner.is_available_boxed().await
    }

    pub async fn health_check(&self) -> bool {
        self.inner.health_check_boxed().await
    }

    pub fn connection_info(&self) -> Value {
        self.inner.connection_info()
    }
}

impl std::fmt::Debug for BoxDataSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxDataSource")
            .field("name", &self.name())
            .field("type", &self.source_type())
            .finish()
    }
}
