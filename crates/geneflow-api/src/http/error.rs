//! Application error type mapping to HTTP status codes and envelope format.

use axum::response::{IntoResponse, Response};

use geneflow_core::engine::EngineError;

use crate::http::response::ApiResponse;

/// Application-level error that maps to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    /// Errors raised by the workflow engine.
    Engine(EngineError),
    /// Malformed request body or parameters.
    Validation(String),
    NotFound(String),
    Internal(String),
}

impl From<EngineError> for AppError {
    fn from(e: EngineError) -> Self {
        AppError::Engine(e)
    }
}

impl AppError {
    /// Machine code and message.
    pub fn code_and_message(&self) -> (&'static str, String) {
        match self {
            AppError::Engine(e @ EngineError::WorkflowNotFound(_)) => {
                ("WORKFLOW_NOT_FOUND", e.to_string())
            }
            AppError::Engine(e @ EngineError::Validation { .. }) => ("VALIDATION_ERROR", e.to_string()),
            AppError::Engine(
                e @ (EngineError::WorkflowTimeout { .. } | EngineError::OperationTimeout { .. }),
            ) => ("TIMEOUT", e.to_string()),
            AppError::Engine(e) => ("ENGINE_ERROR", e.to_string()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Internal(msg) => ("INTERNAL_ERROR", msg.clone()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (code, message) = self.code_and_message();
        if let AppError::Engine(_) | AppError::Internal(_) = &self {
            tracing::warn!(code, %message, "request failed");
        }
        ApiResponse::error(code, &message, None).into_response()
    }
}
