//! HTTP clients for the opengin-x explorer.
//!
//! This crate provides:
//! - ReadApiClient: the knowledge-graph read API (search, metadata,
//!   attributes, relations, explore) with protobuf values decoded
//! - AnalysisClient: the act analysis service (`POST /analyze`)
//! - CallLog: an in-memory record of outbound calls with cURL renderings

mod analysis;
mod call_log;
mod curl;
mod entity;
mod query;
mod read_api;

pub use analysis::{AnalysisClient, analysis_file_name, to_pretty_json};
pub use call_log::{CallLog, DEFAULT_CALL_LOG_CAPACITY};
pub use curl::{CurlRequest, generate_call_id, shell_quote, to_curl};
pub use entity::find_entity_in_response;
pub use query::{QueryParams, QueryType, RequestInfo, build_request, validate_params};
pub use read_api::{ReadApiClient, UpstreamResponse};

pub use tokio_util::sync::CancellationToken;

use thiserror::Error;

/// Errors from client operations.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Base URL cannot be extended with a path: {0}")]
    BaseUrl(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("API returned non-JSON response ({status})")]
    NonJson { status: u16, content_type: String },

    #[error("Request failed with status {0}")]
    Status(u16),

    #[error("Cancelled")]
    Cancelled,

    #[error("{0}")]
    InvalidParams(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Error connecting to analysis service")]
    AnalysisUnavailable(#[source] reqwest::Error),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
