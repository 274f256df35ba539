//! Call log routes.

use axum::{Json, extract::State, http::StatusCode};
use core_types::ApiCall;

use crate::state::AppState;

/// GET /api/calls - Outbound read API calls, newest first.
pub async fn list_calls(State(state): State<AppState>) -> Json<Vec<ApiCall>> {
    Json(state.read_api.call_log().list().await)
}

/// DELETE /api/calls - Clear the call log.
pub async fn clear_calls(State(state): State<AppState>) -> StatusCode {
    state.read_api.call_log().clear().await;
    StatusCode::NO_CONTENT
}
