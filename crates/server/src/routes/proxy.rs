//! Pass-through proxy to the read API.

use axum::{
    Json,
    body::Bytes,
    extract::{OriginalUri, State},
    http::{HeaderName, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use api_client::ClientError;
use core_types::HttpMethod;
use tracing::{error, warn};
use web_types::ProxyError;

use crate::state::AppState;

/// Mount point of the proxy; everything after it is forwarded verbatim.
pub const PROXY_PREFIX: &str = "/api/proxy/";

/// CORS headers attached to every proxy response.
pub fn cors_headers() -> [(HeaderName, &'static str); 3] {
    [
        (header::ACCESS_CONTROL_ALLOW_ORIGIN, "*"),
        (header::ACCESS_CONTROL_ALLOW_METHODS, "GET, POST, OPTIONS"),
        (header::ACCESS_CONTROL_ALLOW_HEADERS, "Content-Type"),
    ]
}

/// GET|POST /api/proxy/*path - Forward to the read API.
///
/// The path is taken from the original, still percent-encoded URI so that
/// encoded segments reach the upstream unchanged.
pub async fn proxy(
    State(state): State<AppState>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    body: Bytes,
) -> Response {
    let method = if method == Method::POST {
        HttpMethod::Post
    } else {
        HttpMethod::Get
    };
    let path = uri.path().strip_prefix(PROXY_PREFIX).unwrap_or_default();

    let upstream = match state
        .read_api
        .forward(method, path, uri.query(), body.to_vec())
        .await
    {
        Ok(upstream) => upstream,
        Err(ClientError::InvalidPath(path)) => {
            warn!(%method, %path, "Refused proxy path");
            return (
                StatusCode::BAD_REQUEST,
                cors_headers(),
                Json(ProxyError::invalid_path(path)),
            )
                .into_response();
        }
        Err(e) => {
            error!(%method, path, error = %e, "Proxy request failed");
            return failure(e.to_string());
        }
    };

    if !upstream.is_json() {
        warn!(
            status = upstream.status,
            content_type = %upstream.content_type,
            preview = %upstream.preview(200),
            "Upstream returned non-JSON response"
        );
        return (
            StatusCode::BAD_GATEWAY,
            cors_headers(),
            Json(ProxyError::non_json(upstream.status, &upstream.content_type)),
        )
            .into_response();
    }

    match upstream.json() {
        Ok(data) => {
            let status = StatusCode::from_u16(upstream.status).unwrap_or(StatusCode::BAD_GATEWAY);
            (status, cors_headers(), Json(data)).into_response()
        }
        Err(e) => {
            error!(path, error = %e, "Upstream JSON could not be parsed");
            failure(e.to_string())
        }
    }
}

/// OPTIONS /api/proxy/*path - CORS preflight.
pub async fn proxy_preflight() -> impl IntoResponse {
    (StatusCode::OK, cors_headers())
}

fn failure(details: String) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        cors_headers(),
        Json(ProxyError::upstream_failure(details)),
    )
        .into_response()
}
