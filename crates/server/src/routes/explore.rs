//! Entity query and exploration routes.

use api_client::{QueryParams, validate_params};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use core_types::{AttributeValueData, ExploreResult};
use protobuf_values::{decode_protobuf_values, has_protobuf_values};
use web_types::{ApiError, QueryResponse};

use crate::state::AppState;

/// POST /api/query - Run a query against the read API.
pub async fn run_query(
    State(state): State<AppState>,
    Json(params): Json<QueryParams>,
) -> Result<Json<QueryResponse>, (StatusCode, Json<ApiError>)> {
    if let Some(message) = validate_params(&params) {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::with_code(message, "INVALID_PARAMS")),
        ));
    }

    let response = state.read_api.execute_query(&params).await;
    let has_protobuf_values = has_protobuf_values(&response.data);
    let decoded = decode_protobuf_values(response.data.clone());

    Ok(Json(QueryResponse {
        response,
        has_protobuf_values,
        decoded,
    }))
}

/// GET /api/explore/:id - Attribute categories of an entity.
pub async fn explore_entity(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Json<ExploreResult> {
    Json(state.read_api.explore_entity(&id, None).await)
}

/// GET /api/entities/:id/attributes/:name - Decoded attribute table.
pub async fn get_attribute_value(
    State(state): State<AppState>,
    Path((id, name)): Path<(String, String)>,
) -> Result<Json<AttributeValueData>, (StatusCode, Json<ApiError>)> {
    state
        .read_api
        .fetch_attribute_value(&id, &name)
        .await
        .map(Json)
        .ok_or_else(|| {
            (
                StatusCode::NOT_FOUND,
                Json(ApiError::with_code(
                    format!("Attribute not found: {}", name),
                    "NOT_FOUND",
                )),
            )
        })
}
