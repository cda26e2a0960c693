//! `POST /api/v1/request` -- validate `{name, parameters}` against the
//! endpoint's rules.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use geneflow_core::request::process_api_request;

use crate::state::AppState;

/// The handler's envelope is returned as-is; a rejected request carries
/// its numeric `error.code` as the HTTP status.
pub async fn process_request(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    let response = process_api_request(state.manager(), &body);
    let status = response["error"]["code"]
        .as_u64()
        .and_then(|code| u16::try_from(code).ok())
        .and_then(|code| StatusCode::from_u16(code).ok())
        .unwrap_or(StatusCode::OK);
    (status, Json(response)).into_response()
}
