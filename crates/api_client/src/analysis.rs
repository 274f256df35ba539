//! Client for the act analysis service.

use std::time::Duration;

use chrono::NaiveDate;
use core_types::AnalysisResult;
use core_types::config::AnalysisConfig;
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::{ClientError, Result};

/// Request body for `POST /analyze`.
#[derive(Debug, Serialize)]
struct AnalyzeBody<'a> {
    doc_id: &'a str,
    api_key: &'a str,
}

/// Client for the analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisClient {
    base_url: String,
    client: reqwest::Client,
}

impl AnalysisClient {
    /// Create a new AnalysisClient with the given config.
    pub fn new(config: &AnalysisConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Ask the service to analyse one act.
    ///
    /// A non-success status becomes [`ClientError::Analysis`] carrying the
    /// service's `error` (or `detail`) message; an unreachable service or an
    /// unreadable body becomes [`ClientError::AnalysisUnavailable`].
    pub async fn analyze(&self, doc_id: &str, api_key: &str) -> Result<AnalysisResult> {
        let url = format!("{}/analyze", self.base_url);
        info!(doc_id, "Requesting act analysis");

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeBody { doc_id, api_key })
            .send()
            .await
            .map_err(ClientError::AnalysisUnavailable)?;

        let status = response.status();
        let data: Value = response
            .json()
            .await
            .map_err(ClientError::AnalysisUnavailable)?;

        if !status.is_success() {
            let message = ["error", "detail"]
                .iter()
                .find_map(|key| data.get(*key).and_then(Value::as_str))
                .unwrap_or("Unknown error")
                .to_string();
            warn!(doc_id, status = status.as_u16(), %message, "Analysis failed");
            return Err(ClientError::Analysis(message));
        }

        Ok(serde_json::from_value(data)?)
    }
}

/// File name for a saved analysis: `<doc_id>-analysis-<YYYY-MM-DD>.json`.
pub fn analysis_file_name(doc_id: &str, date: NaiveDate) -> String {
    format!("{doc_id}-analysis-{}.json", date.format("%Y-%m-%d"))
}

/// Pretty-printed JSON of an analysis, as written to disk.
pub fn to_pretty_json(result: &AnalysisResult) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_body_serialization() {
        let body = AnalyzeBody {
            doc_id: "2024-07",
            api_key: "key",
        };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"doc_id":"2024-07","api_key":"key"}"#);
    }

    #[test]
    fn test_analysis_file_name() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 9).unwrap();
        assert_eq!(analysis_file_name("1234-56", date), "1234-56-analysis-2025-03-09.json");
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = AnalysisClient::new(&AnalysisConfig {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_pretty_json_keeps_extra_keys() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"summary": "s", "model": "m"}"#).unwrap();
        let text = to_pretty_json(&result).unwrap();
        assert!(text.contains("\"model\": \"m\""));
        assert!(text.contains('\n'));
    }
}
