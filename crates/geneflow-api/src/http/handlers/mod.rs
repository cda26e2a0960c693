//! HTTP request handlers for the REST API.

pub mod request;
pub mod source;
pub mod workflow;
