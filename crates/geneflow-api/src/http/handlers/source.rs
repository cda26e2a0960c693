//! Data source listing handler.

use std::time::Instant;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use serde_json::Value;

use crate::cli::source::{collect_sources, summary_json};
use crate::http::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SourcesQuery {
    /// Run a health check against every source.
    #[serde(default)]
    pub health: bool,
}

/// GET /api/v1/sources
pub async fn list_sources(
    State(state): State<AppState>,
    Query(query): Query<SourcesQuery>,
) -> Json<ApiResponse<Value>> {
    let start = Instant::now();
    let summaries = collect_sources(state.manager(), query.health).await;
    let data = Value::Array(summaries.iter().map(summary_json).collect());
    Json(ApiResponse::success(data, start))
}
