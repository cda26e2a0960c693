//! Shared domain types for GeneFlow.
//!
//! This crate contains the declarative types used across the workspace:
//! workflow definitions, data source and processor declarations, parameter
//! templates, validation rules and engine settings.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono.

pub mod config;
pub mod source;
pub mod validation;
pub mod workflow;
