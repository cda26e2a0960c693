//! Infrastructure layer for GeneFlow.
//!
//! Contains the concrete data source backends behind the traits defined in
//! `geneflow-core` (REST over reqwest, SQLite over sqlx, the local
//! filesystem, and a file-backed cache), the component factory that builds
//! them from configuration, and configuration file loading.

pub mod config;
pub mod factory;
pub mod sources;

pub use factory::BuiltinComponentFactory;
