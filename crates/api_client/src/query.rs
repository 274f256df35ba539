//! Query parameters and request building for the read API.

use core_types::{EntitySearchRequest, HttpMethod, Kind, RelationsRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::{ClientError, Result};

/// The kinds of query the explorer can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Search,
    Metadata,
    Attributes,
    Relations,
    Explore,
}

impl QueryType {
    pub const ALL: [QueryType; 5] = [
        QueryType::Search,
        QueryType::Metadata,
        QueryType::Attributes,
        QueryType::Relations,
        QueryType::Explore,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            QueryType::Search => "Search Entity",
            QueryType::Metadata => "Metadata",
            QueryType::Attributes => "Attributes",
            QueryType::Relations => "Relations",
            QueryType::Explore => "Explore Attributes",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            QueryType::Search => "Search by ID or kind",
            QueryType::Metadata => "Entity metadata",
            QueryType::Attributes => "Entity attribute values",
            QueryType::Relations => "Entity relationships",
            QueryType::Explore => "Discover all attributes",
        }
    }
}

impl std::str::FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "search" => Ok(QueryType::Search),
            "metadata" => Ok(QueryType::Metadata),
            "attributes" | "attribute" => Ok(QueryType::Attributes),
            "relations" | "relation" => Ok(QueryType::Relations),
            "explore" => Ok(QueryType::Explore),
            other => Err(format!("Unknown query type: {other}")),
        }
    }
}

/// Everything a user can fill in for a query. Empty strings count as unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryParams {
    pub query_type: QueryType,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub kind_major: Option<String>,
    #[serde(default)]
    pub kind_minor: Option<String>,
    #[serde(default)]
    pub entity_name: Option<String>,
    #[serde(default)]
    pub attribute_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub relation_id: Option<String>,
    #[serde(default)]
    pub related_entity_id: Option<String>,
    #[serde(default)]
    pub relation_name: Option<String>,
    #[serde(default)]
    pub direction: Option<String>,
    #[serde(default)]
    pub active_at: Option<String>,
}

impl QueryParams {
    /// Parameters of the given type with nothing filled in.
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            entity_id: None,
            kind_major: None,
            kind_minor: None,
            entity_name: None,
            attribute_name: None,
            start_time: None,
            end_time: None,
            fields: Vec::new(),
            relation_id: None,
            related_entity_id: None,
            relation_name: None,
            direction: None,
            active_at: None,
        }
    }

    /// Set the target entity.
    pub fn with_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn owned(value: &Option<String>) -> Option<String> {
    present(value).map(str::to_string)
}

/// Check that the parameters carry what their query type needs.
///
/// Returns the message to show the user, or `None` when valid.
pub fn validate_params(params: &QueryParams) -> Option<String> {
    match params.query_type {
        QueryType::Search => {
            if present(&params.entity_id).is_none()
                && present(&params.kind_major).is_none()
                && present(&params.entity_name).is_none()
            {
                return Some(
                    "At least one search criteria is required (Entity ID, Kind, or Name)"
                        .to_string(),
                );
            }
        }
        QueryType::Metadata | QueryType::Relations | QueryType::Explore => {
            if present(&params.entity_id).is_none() {
                return Some("Entity ID is required".to_string());
            }
        }
        QueryType::Attributes => {
            if present(&params.entity_id).is_none() {
                return Some("Entity ID is required".to_string());
            }
            if present(&params.attribute_name).is_none() {
                return Some("Attribute name is required".to_string());
            }
        }
    }
    None
}

/// [`validate_params`] as a `Result`.
pub(crate) fn ensure_valid(params: &QueryParams) -> Result<()> {
    match validate_params(params) {
        Some(message) => Err(ClientError::InvalidParams(message)),
        None => Ok(()),
    }
}

/// A request against the read API, relative to its base URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestInfo {
    pub method: HttpMethod,
    /// Unencoded path segments appended to the base URL.
    pub segments: Vec<String>,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RequestInfo {
    fn new(method: HttpMethod, segments: Vec<String>) -> Self {
        Self {
            method,
            segments,
            query: Vec::new(),
            body: None,
        }
    }

    /// Absolute URL of this request under `base`; segments are percent-encoded.
    pub fn url(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ClientError::BaseUrl(base.to_string()))?;
            path.pop_if_empty();
            path.extend(self.segments.iter().map(String::as_str));
        }

        if !self.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url)
    }
}

/// Translate query parameters into a read-API request.
pub fn build_request(params: &QueryParams) -> RequestInfo {
    let entity_id = owned(&params.entity_id).unwrap_or_default();

    match params.query_type {
        QueryType::Search => {
            let kind = owned(&params.kind_major).map(|major| Kind {
                major,
                minor: owned(&params.kind_minor),
            });
            let body = EntitySearchRequest {
                id: owned(&params.entity_id),
                kind,
                name: owned(&params.entity_name),
            };

            let mut request = RequestInfo::new(HttpMethod::Post, vec!["search".to_string()]);
            request.body = serde_json::to_value(body).ok();
            request
        }

        QueryType::Metadata => {
            RequestInfo::new(HttpMethod::Get, vec![entity_id, "metadata".to_string()])
        }

        QueryType::Attributes => {
            let attribute = owned(&params.attribute_name).unwrap_or_default();
            let mut request = RequestInfo::new(
                HttpMethod::Get,
                vec![entity_id, "attributes".to_string(), attribute],
            );

            if let Some(start) = owned(&params.start_time) {
                request.query.push(("startTime".to_string(), start));
            }
            if let Some(end) = owned(&params.end_time) {
                request.query.push(("endTime".to_string(), end));
            }
            for field in &params.fields {
                request.query.push(("fields".to_string(), field.clone()));
            }
            request
        }

        QueryType::Relations => {
            let mut body = RelationsRequest::default();
            if let Some(relation_id) = owned(&params.relation_id) {
                body.id = Some(relation_id);
            } else {
                body.related_entity_id = owned(&params.related_entity_id);
                body.name = owned(&params.relation_name);
                body.direction = owned(&params.direction);
                // activeAt and a time range are mutually exclusive
                if let Some(active_at) = owned(&params.active_at) {
                    body.active_at = Some(active_at);
                } else {
                    body.start_time = owned(&params.start_time);
                    body.end_time = owned(&params.end_time);
                }
            }

            let mut request =
                RequestInfo::new(HttpMethod::Post, vec![entity_id, "relations".to_string()]);
            if !body.is_empty() {
                request.body = serde_json::to_value(body).ok();
            }
            request
        }

        // Explore walks relations itself; see ReadApiClient::explore_entity.
        QueryType::Explore => {
            RequestInfo::new(HttpMethod::Post, vec![entity_id, "relations".to_string()])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn base() -> Url {
        Url::parse("https://api.example/v1/entities").unwrap()
    }

    #[test]
    fn test_query_type_labels() {
        assert_eq!(QueryType::Explore.label(), "Explore Attributes");
        assert_eq!(QueryType::Search.description(), "Search by ID or kind");
        assert_eq!("Relations".parse::<QueryType>().unwrap(), QueryType::Relations);
        assert!("graph".parse::<QueryType>().is_err());
    }

    #[test]
    fn test_query_params_deserialize_camel_case() {
        let params: QueryParams = serde_json::from_value(json!({
            "queryType": "attributes",
            "entityId": "e1",
            "attributeName": "budget",
            "fields": ["a"]
        }))
        .unwrap();

        assert_eq!(params.query_type, QueryType::Attributes);
        assert_eq!(params.attribute_name.as_deref(), Some("budget"));
        assert_eq!(params.fields, vec!["a"]);
    }

    #[test]
    fn test_validate_search_needs_criteria() {
        let mut params = QueryParams::new(QueryType::Search);
        params.entity_name = Some(String::new());
        assert_eq!(
            validate_params(&params).as_deref(),
            Some("At least one search criteria is required (Entity ID, Kind, or Name)")
        );

        params.kind_major = Some("Organisation".to_string());
        assert!(validate_params(&params).is_none());
    }

    #[test]
    fn test_validate_entity_requirements() {
        for query_type in [QueryType::Metadata, QueryType::Relations, QueryType::Explore] {
            let params = QueryParams::new(query_type);
            assert_eq!(validate_params(&params).as_deref(), Some("Entity ID is required"));
            assert!(validate_params(&params.with_entity("e1")).is_none());
        }

        let params = QueryParams::new(QueryType::Attributes).with_entity("e1");
        assert_eq!(validate_params(&params).as_deref(), Some("Attribute name is required"));
        assert!(matches!(ensure_valid(&params), Err(ClientError::InvalidParams(_))));
    }

    #[test]
    fn test_build_search() {
        let mut params = QueryParams::new(QueryType::Search);
        params.kind_major = Some("Organisation".to_string());
        params.kind_minor = Some("department".to_string());
        params.entity_name = Some("Health".to_string());

        let request = build_request(&params);

        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(
            request.body,
            Some(json!({"kind": {"major": "Organisation", "minor": "department"}, "name": "Health"}))
        );
        assert_eq!(
            request.url(&base()).unwrap().as_str(),
            "https://api.example/v1/entities/search"
        );
    }

    #[test]
    fn test_build_search_ignores_minor_without_major() {
        let mut params = QueryParams::new(QueryType::Search).with_entity("e1");
        params.kind_minor = Some("department".to_string());

        let request = build_request(&params);
        assert_eq!(request.body, Some(json!({"id": "e1"})));
    }

    #[test]
    fn test_build_metadata_encodes_id() {
        let params = QueryParams::new(QueryType::Metadata).with_entity("a b/c");
        let request = build_request(&params);

        assert_eq!(request.method, HttpMethod::Get);
        assert!(request.body.is_none());
        assert_eq!(
            request.url(&base()).unwrap().as_str(),
            "https://api.example/v1/entities/a%20b%2Fc/metadata"
        );
    }

    #[test]
    fn test_build_attributes_with_query() {
        let mut params = QueryParams::new(QueryType::Attributes).with_entity("e1");
        params.attribute_name = Some("budget".to_string());
        params.start_time = Some("2020-01-01".to_string());
        params.fields = vec!["a".to_string(), "b".to_string()];

        let url = build_request(&params).url(&base()).unwrap();

        assert_eq!(
            url.as_str(),
            "https://api.example/v1/entities/e1/attributes/budget?startTime=2020-01-01&fields=a&fields=b"
        );
    }

    #[test]
    fn test_build_relations_prefers_relation_id() {
        let mut params = QueryParams::new(QueryType::Relations).with_entity("e1");
        params.relation_id = Some("rel_9".to_string());
        params.relation_name = Some("AS_CATEGORY".to_string());

        let request = build_request(&params);
        assert_eq!(request.body, Some(json!({"id": "rel_9"})));
    }

    #[test]
    fn test_build_relations_active_at_excludes_range() {
        let mut params = QueryParams::new(QueryType::Relations).with_entity("e1");
        params.relation_name = Some("AS_CATEGORY".to_string());
        params.active_at = Some("2024-01-01".to_string());
        params.start_time = Some("2020-01-01".to_string());

        let request = build_request(&params);
        assert_eq!(
            request.body,
            Some(json!({"name": "AS_CATEGORY", "activeAt": "2024-01-01"}))
        );
    }

    #[test]
    fn test_build_relations_empty_body_omitted() {
        let params = QueryParams::new(QueryType::Relations).with_entity("e1");
        let request = build_request(&params);

        assert!(request.body.is_none());
        assert_eq!(
            request.url(&base()).unwrap().as_str(),
            "https://api.example/v1/entities/e1/relations"
        );
    }

    #[test]
    fn test_url_with_trailing_slash_base() {
        let base = Url::parse("https://api.example/v1/entities/").unwrap();
        let request = build_request(&QueryParams::new(QueryType::Metadata).with_entity("e1"));

        assert_eq!(
            request.url(&base).unwrap().as_str(),
            "https://api.example/v1/entities/e1/metadata"
        );
    }
}
