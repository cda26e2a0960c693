//! Business logic for GeneFlow.
//!
//! This crate owns the workflow engine, the configuration manager and the
//! `DataSource` / `DataProcessor` traits. Concrete backends live in
//! `geneflow-infra`; this crate never performs network or database I/O.

pub mod condition;
pub mod config;
pub mod datasource;
pub mod engine;
pub mod processor;
pub mod request;
pub mod template;
pub mod value;

#[cfg(test)]
pub(crate) mod testing;
