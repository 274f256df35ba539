//! Request and response bodies of the HTTP API.

use core_types::{Act, ApiResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error body returned by the API routes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }

    pub fn with_code(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
        }
    }
}

/// Error envelope of the read-API proxy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ProxyError {
    /// Upstream answered with something other than JSON.
    pub fn non_json(status: u16, content_type: impl Into<String>) -> Self {
        Self {
            error: format!("API returned non-JSON response ({status})"),
            content_type: Some(content_type.into()),
            details: None,
        }
    }

    /// Proxy path that would leave the read API base path.
    pub fn invalid_path(path: impl Into<String>) -> Self {
        Self {
            error: "Invalid proxy path".to_string(),
            content_type: None,
            details: Some(path.into()),
        }
    }

    /// Upstream could not be reached or its body could not be read.
    pub fn upstream_failure(details: impl Into<String>) -> Self {
        Self {
            error: "Failed to fetch from API".to_string(),
            content_type: None,
            details: Some(details.into()),
        }
    }
}

/// Query parameters of `GET /api/acts`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActFilter {
    /// Case-insensitive text over id, number and description.
    pub search: Option<String>,
    pub year: Option<String>,
    pub domain: Option<String>,
    pub doc_type: Option<String>,
}

/// `GET /api/acts/:id`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActDetail {
    pub act: Act,
    pub pdf_url: String,
    pub pdf_available: bool,
}

/// Number of acts sharing one value of a field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountEntry {
    pub key: String,
    pub count: u32,
}

/// Dashboard numbers for the acts dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActsStats {
    pub total: u32,
    pub by_year: Vec<CountEntry>,
    pub by_domain: Vec<CountEntry>,
    pub by_doc_type: Vec<CountEntry>,
}

/// Body of `POST /api/acts/:id/analyze`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default)]
    pub api_key: String,
}

/// `POST /api/query`: the raw response plus its decoded form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    #[serde(flatten)]
    pub response: ApiResponse,
    pub has_protobuf_values: bool,
    pub decoded: Value,
}
