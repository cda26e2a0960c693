//! Data source abstraction: the backend trait, its type-erased wrapper and
//! the name-keyed registry.

pub mod box_source;
pub mod registry;
pub mod source;

pub use box_source::BoxDataSource;
pub use registry::DataSourceRegistry;
pub use source::{DataSource, DataSourceError};
