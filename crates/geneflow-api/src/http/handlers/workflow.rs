//! Workflow listing, inspection and execution handlers.

use std::time::Instant;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};

use geneflow_core::engine::EngineError;

use crate::http::error::AppError;
use crate::http::response::ApiResponse;
use crate::state::AppState;

/// Body of `POST /workflows/{name}/run`.
#[derive(Debug, Default, Deserialize)]
pub struct RunWorkflowRequest {
    #[serde(default)]
    pub input: Value,
}

/// GET /api/v1/workflows
pub async fn list_workflows(State(state): State<AppState>) -> Json<ApiResponse<Value>> {
    let start = Instant::now();
    let manager = state.manager();
    let workflows: Vec<_> = manager
        .available_workflows()
        .into_iter()
        .filter_map(|name| manager.get_workflow(&name))
        .map(|wf| {
            json!({
                "name": wf.name,
                "description": wf.description,
                "steps": wf.steps.len(),
            })
        })
        .collect();
    Json(ApiResponse::success(json!(workflows), start))
}

/// GET /api/v1/workflows/{name}
pub async fn get_workflow(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let workflow = state
        .manager()
        .get_workflow(&name)
        .ok_or_else(|| EngineError::WorkflowNotFound(name.clone()))?;
    let definition =
        serde_json::to_value(workflow.as_ref()).map_err(|e| AppError::Internal(e.to_string()))?;
    Ok(Json(ApiResponse::success(definition, start)))
}

/// POST /api/v1/workflows/{name}/run
///
/// Operation failures are reported inside the run result; only unknown
/// workflows produce an error response.
pub async fn run_workflow(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<Value>>, AppError> {
    let start = Instant::now();
    let request: RunWorkflowRequest = if body.is_empty() {
        RunWorkflowRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::Validation(format!("invalid request body: {e}")))?
    };
    let input = if request.input.is_null() {
        json!({})
    } else {
        request.input
    };

    let result = state.engine.execute_workflow(&name, input).await?;
    let mut data = result.to_value();
    data["run_id"] = json!(result.run_id.to_string());
    data["duration_ms"] = json!(result.duration_ms);
    Ok(Json(ApiResponse::success(data, start)))
}
