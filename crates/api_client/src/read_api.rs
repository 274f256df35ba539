//! Client for the knowledge-graph read API.

use std::time::{Duration, Instant};

use chrono::Utc;
use core_types::config::UpstreamConfig;
use core_types::{
    ApiCall, ApiResponse, AttributeValueData, CATEGORY_RELATION, CategoryNode, EntityInfo,
    EntitySearchRequest, ExploreResult, HttpMethod, RelationResult, RelationsRequest,
};
use futures::future::join_all;
use protobuf_values::{decode_protobuf_struct, decode_protobuf_values};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::call_log::CallLog;
use crate::curl::{CurlRequest, generate_call_id, to_curl};
use crate::entity::find_entity_in_response;
use crate::query::{QueryParams, RequestInfo, build_request, ensure_valid};
use crate::{ClientError, Result};

const JSON: &str = "application/json";
const JSON_HEADERS: [(&str, &str); 2] = [("Accept", JSON), ("Content-Type", JSON)];

/// A raw upstream reply, as relayed by the proxy.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl UpstreamResponse {
    /// Whether the upstream declared a JSON body.
    pub fn is_json(&self) -> bool {
        self.content_type.contains(JSON)
    }

    /// Parse the body, refusing anything not declared as JSON.
    pub fn json(&self) -> Result<Value> {
        if !self.is_json() {
            return Err(ClientError::NonJson {
                status: self.status,
                content_type: self.content_type.clone(),
            });
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The first `max_chars` characters of the body, for logging.
    pub fn preview(&self, max_chars: usize) -> String {
        String::from_utf8_lossy(&self.body)
            .chars()
            .take(max_chars)
            .collect()
    }
}

/// Client for the read API. Cloning shares the connection pool and call log.
#[derive(Debug, Clone)]
pub struct ReadApiClient {
    base_url: Url,
    client: reqwest::Client,
    log: CallLog,
}

impl ReadApiClient {
    /// Create a client from the upstream section of the configuration.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        Self::with_log(
            &config.base_url,
            Duration::from_secs(config.timeout_secs),
            CallLog::new(config.call_log_capacity),
        )
    }

    /// Create a client recording into an existing call log.
    pub fn with_log(base_url: &str, timeout: Duration, log: CallLog) -> Result<Self> {
        let base_url = Url::parse(base_url)?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::BaseUrl(base_url.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            client,
            log,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn call_log(&self) -> &CallLog {
        &self.log
    }

    /// Send a request, recording it in the call log before it goes out and
    /// updating the entry with the outcome.
    async fn send_logged(
        &self,
        method: HttpMethod,
        url: Url,
        body: Option<Vec<u8>>,
        cancel: Option<&CancellationToken>,
    ) -> Result<reqwest::Response> {
        let logged_body = body.as_deref().map(|raw| {
            serde_json::from_slice::<Value>(raw)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(raw).into_owned()))
        });
        let call_id = generate_call_id();
        self.log
            .add(ApiCall {
                id: call_id.clone(),
                timestamp: Utc::now(),
                curl: to_curl(&CurlRequest {
                    url: url.as_str(),
                    method,
                    headers: &JSON_HEADERS,
                    body: logged_body.as_ref(),
                }),
                method,
                url: url.to_string(),
                status: None,
                duration_ms: None,
                error: None,
            })
            .await;

        debug!(%method, %url, "Calling read API");

        let mut request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url),
        }
        .header(ACCEPT, JSON)
        .header(CONTENT_TYPE, JSON);
        if let Some(body) = body {
            request = request.body(body);
        }

        let started = Instant::now();
        let outcome = match cancel {
            Some(token) => tokio::select! {
                _ = token.cancelled() => Err(ClientError::Cancelled),
                response = request.send() => response.map_err(ClientError::from),
            },
            None => request.send().await.map_err(ClientError::from),
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            Ok(response) => {
                self.log
                    .record_response(&call_id, response.status().as_u16(), duration_ms)
                    .await;
            }
            Err(err) => {
                warn!(%method, error = %err, "Read API call failed");
                self.log
                    .record_error(&call_id, err.to_string(), duration_ms)
                    .await;
            }
        }

        outcome
    }

    /// Send a request and return its protobuf-decoded JSON body.
    async fn fetch_decoded(
        &self,
        request: &RequestInfo,
        cancel: Option<&CancellationToken>,
    ) -> Result<Value> {
        let url = request.url(&self.base_url)?;
        let body = request.body.as_ref().map(serde_json::to_vec).transpose()?;

        let response = self.send_logged(request.method, url, body, cancel).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let data: Value = response.json().await?;
        Ok(decode_protobuf_values(data))
    }

    /// Relay a request verbatim: `path` (already percent-encoded) and
    /// `query` are appended to the base URL; a POST body is sent only when
    /// non-empty.
    pub async fn forward(
        &self,
        method: HttpMethod,
        path: &str,
        query: Option<&str>,
        body: Vec<u8>,
    ) -> Result<UpstreamResponse> {
        if has_dot_segment(path) {
            return Err(ClientError::InvalidPath(path.to_string()));
        }

        let mut target = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            target.push('?');
            target.push_str(query);
        }
        let url = Url::parse(&target)?;

        let body = (method == HttpMethod::Post && !body.is_empty()).then_some(body);
        let response = self.send_logged(method, url, body, None).await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let body = response.bytes().await?.to_vec();

        Ok(UpstreamResponse {
            status,
            content_type,
            body,
        })
    }

    /// Run a query and report the outcome, including failures, as an
    /// [`ApiResponse`]. The data is returned as received (not decoded).
    pub async fn execute_query(&self, params: &QueryParams) -> ApiResponse {
        let request = build_request(params);
        let method = request.method;
        let request_body = request.body.clone();

        let url = match request.url(&self.base_url) {
            Ok(url) => url,
            Err(err) => {
                return ApiResponse {
                    data: Value::Null,
                    status: 500,
                    endpoint: self.base_url.to_string(),
                    method,
                    request_body,
                    error: Some(err.to_string()),
                };
            }
        };
        let endpoint = url.to_string();

        let result = async {
            let body = request.body.as_ref().map(serde_json::to_vec).transpose()?;
            let response = self.send_logged(method, url, body, None).await?;
            let status = response.status().as_u16();
            let data: Value = response.json().await?;
            Ok::<_, ClientError>((status, data))
        }
        .await;

        match result {
            Ok((status, data)) => ApiResponse {
                data,
                status,
                endpoint,
                method,
                request_body,
                error: None,
            },
            Err(err) => ApiResponse {
                data: Value::Null,
                status: 500,
                endpoint,
                method,
                request_body,
                error: Some(err.to_string()),
            },
        }
    }

    /// Validate the parameters, then run [`execute_query`](Self::execute_query).
    pub async fn run_query(&self, params: &QueryParams) -> Result<ApiResponse> {
        ensure_valid(params)?;
        Ok(self.execute_query(params).await)
    }

    /// `POST /search`, decoded.
    pub async fn search(&self, request: &EntitySearchRequest) -> Result<Value> {
        let request = RequestInfo {
            method: HttpMethod::Post,
            segments: vec!["search".to_string()],
            query: Vec::new(),
            body: Some(serde_json::to_value(request)?),
        };
        self.fetch_decoded(&request, None).await
    }

    /// Resolve an entity by id. Any failure yields `None`.
    pub async fn fetch_entity_by_id(
        &self,
        entity_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> Option<EntityInfo> {
        let request = RequestInfo {
            method: HttpMethod::Post,
            segments: vec!["search".to_string()],
            query: Vec::new(),
            body: serde_json::to_value(EntitySearchRequest::by_id(entity_id)).ok(),
        };

        match self.fetch_decoded(&request, cancel).await {
            Ok(data) => {
                let entity = find_entity_in_response(&data, entity_id);
                if entity.is_none() {
                    debug!(entity_id, "Entity not present in search response");
                }
                entity
            }
            Err(err) => {
                debug!(entity_id, error = %err, "Entity lookup failed");
                None
            }
        }
    }

    /// Relations of an entity, optionally filtered by name. The upstream may
    /// answer with a bare array or with `{relations: [...]}`. Any failure
    /// yields an empty list.
    pub async fn fetch_entity_relations(
        &self,
        entity_id: &str,
        relation_name: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Vec<RelationResult> {
        let body = RelationsRequest {
            name: relation_name.map(str::to_string),
            ..Default::default()
        };
        let request = RequestInfo {
            method: HttpMethod::Post,
            segments: vec![entity_id.to_string(), "relations".to_string()],
            query: Vec::new(),
            body: serde_json::to_value(body).ok(),
        };

        match self.fetch_decoded(&request, cancel).await {
            Ok(data) => relations_from(data),
            Err(err) => {
                debug!(entity_id, error = %err, "Relations lookup failed");
                Vec::new()
            }
        }
    }

    /// Decoded table for one attribute of an entity. Any failure yields `None`.
    pub async fn fetch_attribute_value(
        &self,
        entity_id: &str,
        attribute_name: &str,
    ) -> Option<AttributeValueData> {
        let request = RequestInfo {
            method: HttpMethod::Get,
            segments: vec![
                entity_id.to_string(),
                "attributes".to_string(),
                attribute_name.to_string(),
            ],
            query: Vec::new(),
            body: None,
        };

        match self.fetch_decoded(&request, None).await {
            Ok(data) => decode_protobuf_struct(&data),
            Err(err) => {
                debug!(entity_id, attribute_name, error = %err, "Attribute lookup failed");
                None
            }
        }
    }

    /// Discover the attribute categories of an entity: its `AS_CATEGORY`
    /// relations, with every related entity resolved concurrently for its
    /// name and kind.
    pub async fn explore_entity(
        &self,
        entity_id: &str,
        cancel: Option<&CancellationToken>,
    ) -> ExploreResult {
        let result = ExploreResult::new(entity_id);
        let cancelled = || cancel.is_some_and(CancellationToken::is_cancelled);

        if cancelled() {
            return result.fail("Cancelled");
        }

        let relations = self
            .fetch_entity_relations(entity_id, Some(CATEGORY_RELATION), cancel)
            .await;
        info!(
            entity_id,
            relation = CATEGORY_RELATION,
            count = relations.len(),
            "Found category relations"
        );

        let lookups = relations.iter().map(|relation| async move {
            let entity = self
                .fetch_entity_by_id(&relation.related_entity_id, cancel)
                .await;
            CategoryNode::from_relation(relation, entity)
        });
        let categories = join_all(lookups).await;

        if cancelled() {
            return result.fail("Cancelled");
        }

        ExploreResult {
            categories,
            relations,
            loading: false,
            ..result
        }
    }

    /// Shorthand for [`fetch_attribute_value`](Self::fetch_attribute_value).
    pub async fn get_attribute_value(
        &self,
        entity_id: &str,
        attribute_name: &str,
    ) -> Option<AttributeValueData> {
        self.fetch_attribute_value(entity_id, attribute_name).await
    }
}

fn relations_from(data: Value) -> Vec<RelationResult> {
    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("relations") {
            Some(Value::Array(items)) => items,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

/// Whether `path` has a `.` or `..` segment, plain or percent-encoded.
/// Such paths would resolve outside the base URL.
fn has_dot_segment(path: &str) -> bool {
    path.split(['/', '\\']).any(|segment| {
        let segment = segment.to_ascii_lowercase().replace("%2e", ".");
        segment == "." || segment == ".."
    })
}
