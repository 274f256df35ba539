//! Acts viewer routes.

use api_client::ClientError;
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use core_types::{Act, AnalysisResult};
use tracing::{debug, error};
use web_types::{ActDetail, ActFilter, ActsStats, AnalyzeRequest, ApiError};

use crate::state::AppState;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

fn act_not_found(id: &str) -> (StatusCode, Json<ApiError>) {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError::with_code(
            format!("Act not found: {}", id),
            "NOT_FOUND",
        )),
    )
}

/// GET /api/acts - List acts with optional filters.
pub async fn list_acts(
    State(state): State<AppState>,
    Query(filter): Query<ActFilter>,
) -> Json<Vec<Act>> {
    Json(state.acts.list(&filter).into_iter().cloned().collect())
}

/// GET /api/acts/stats - Dataset totals.
pub async fn get_acts_stats(State(state): State<AppState>) -> Json<ActsStats> {
    Json(state.acts.stats())
}

/// GET /api/acts/:id - Act detail with its PDF location.
pub async fn get_act(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ActDetail> {
    let act = state.acts.get(&id).ok_or_else(|| act_not_found(&id))?;

    Ok(Json(ActDetail {
        act: act.clone(),
        pdf_url: acts::pdf_url(&act.doc_id),
        pdf_available: state.pdfs.exists(&act.doc_id),
    }))
}

/// POST /api/acts/:id/analyze - Run the analysis service on an act.
pub async fn analyze_act(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AnalyzeRequest>,
) -> ApiResult<AnalysisResult> {
    // The service fetches the document itself; local records are optional.
    if state.acts.get(&id).is_none() {
        debug!(doc_id = %id, "Analyzing act not in the local dataset");
    }

    let api_key = req.api_key.trim();
    if api_key.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_code("API key is required", "MISSING_API_KEY")),
        ));
    }

    state.analysis.analyze(&id, api_key).await.map(Json).map_err(|e| {
        error!(doc_id = %id, error = %e, "Act analysis failed");
        let code = match e {
            ClientError::AnalysisUnavailable(_) => "ANALYSIS_UNAVAILABLE",
            _ => "ANALYSIS_FAILED",
        };
        (
            StatusCode::BAD_GATEWAY,
            Json(ApiError::with_code(e.to_string(), code)),
        )
    })
}
