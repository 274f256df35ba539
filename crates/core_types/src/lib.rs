//! Core types for the opengin-x explorer.
//!
//! This crate defines the shared data structures used across the
//! read-API client, the acts viewer, the HTTP server and the CLI.

pub mod config;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use config::Config;

/// Relation name linking an entity to its attribute categories.
pub const CATEGORY_RELATION: &str = "AS_CATEGORY";

/// Kind used when an entity could not be resolved.
pub const UNKNOWN_KIND: &str = "UNKNOWN";

/// HTTP method of an outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    /// Upper-case method name as it appears on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Major/minor classification of an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Kind {
    pub major: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minor: Option<String>,
}

impl Kind {
    /// Create a kind with only a major component.
    pub fn major(major: impl Into<String>) -> Self {
        Self {
            major: major.into(),
            minor: None,
        }
    }

    /// The placeholder kind for entities that could not be resolved.
    pub fn unknown() -> Self {
        Self::major(UNKNOWN_KIND)
    }
}

/// An entity as found in a read-API search response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub id: String,
    pub kind: Kind,
    pub name: String,
    #[serde(default)]
    pub created: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terminated: Option<String>,
}

/// One relation edge returned by `POST /<id>/relations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelationResult {
    pub id: String,
    pub related_entity_id: String,
    pub name: String,
    pub direction: String,
    pub start_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

/// Attribute discovered under a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<AttributeValueData>,
}

/// A category in the explore tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
    pub id: String,
    pub name: String,
    pub kind: Kind,
    #[serde(default)]
    pub children: Vec<CategoryNode>,
    #[serde(default)]
    pub attributes: Vec<AttributeNode>,
    #[serde(default)]
    pub expanded: bool,
    pub relation_direction: String,
    pub relation_id: String,
    pub start_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl CategoryNode {
    /// Build a category node from a relation and the (optional) resolved entity.
    pub fn from_relation(relation: &RelationResult, entity: Option<EntityInfo>) -> Self {
        let (name, kind) = match entity {
            Some(info) => (info.name, info.kind),
            None => (relation.related_entity_id.clone(), Kind::unknown()),
        };

        Self {
            id: relation.related_entity_id.clone(),
            name,
            kind,
            children: Vec::new(),
            attributes: Vec::new(),
            expanded: false,
            relation_direction: relation.direction.clone(),
            relation_id: relation.id.clone(),
            start_time: relation.start_time.clone(),
            end_time: relation.end_time.clone(),
        }
    }
}

/// Result of exploring the attribute categories of an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExploreResult {
    pub entity_id: String,
    pub categories: Vec<CategoryNode>,
    pub relations: Vec<RelationResult>,
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExploreResult {
    /// A fresh, still-loading result for the given entity.
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            categories: Vec::new(),
            relations: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// Finish the result with an error message.
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        self.error = Some(message.into());
        self.loading = false;
        self
    }
}

/// Tabular view of an attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeValueData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
    pub raw: Value,
}

impl AttributeValueData {
    /// No table could be recognised; keep only the raw value.
    pub fn raw_only(raw: Value) -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            raw,
        }
    }

    /// Whether a table was recognised.
    pub fn is_tabular(&self) -> bool {
        !self.columns.is_empty()
    }
}

/// Body of `POST /search`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntitySearchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<Kind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EntitySearchRequest {
    /// Search for a single entity by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }
}

/// Body of `POST /<id>/relations`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_entity_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
}

impl RelationsRequest {
    /// True when no filter is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Outcome of a single read-API query.
///
/// Failures never escape as errors: transport problems are reported in
/// `error` with status 500 so callers can render them inline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse {
    pub data: Value,
    pub status: u16,
    pub endpoint: String,
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A logged outbound call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCall {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub curl: String,
    pub method: HttpMethod,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Deserialize `null` as the type's default value.
///
/// Exported datasets and the analysis service emit `null` for absent
/// strings and lists; `#[serde(default)]` alone only covers missing keys.
pub fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A legislative act record from the static dataset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Act {
    #[serde(deserialize_with = "null_as_default")]
    pub doc_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub doc_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub num: String,
    #[serde(deserialize_with = "null_as_default")]
    pub date_str: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url_metadata: String,
    #[serde(deserialize_with = "null_as_default")]
    pub lang: String,
    #[serde(deserialize_with = "null_as_default")]
    pub url_pdf: String,
    #[serde(deserialize_with = "null_as_default")]
    pub doc_number: String,
    #[serde(deserialize_with = "null_as_default")]
    pub domain: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

impl Act {
    /// Year of the act: the explicit `year` field, else the leading
    /// four digits of `date_str`.
    pub fn year(&self) -> Option<&str> {
        if let Some(year) = self.year.as_deref()
            && !year.is_empty()
        {
            return Some(year);
        }

        let prefix = self.date_str.get(..4)?;
        prefix
            .chars()
            .all(|c| c.is_ascii_digit())
            .then_some(prefix)
    }
}

/// Section number as emitted by the analysis service (text or number).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SectionNumber {
    Number(i64),
    Float(f64),
    Text(String),
}

impl Default for SectionNumber {
    fn default() -> Self {
        SectionNumber::Text(String::new())
    }
}

impl std::fmt::Display for SectionNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SectionNumber::Number(n) => write!(f, "{n}"),
            SectionNumber::Float(n) => write!(f, "{n}"),
            SectionNumber::Text(s) => f.write_str(s),
        }
    }
}

/// A section detected by the analysis service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, deserialize_with = "null_as_default")]
    pub section_number: SectionNumber,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub footnotes: Vec<String>,
}

/// Response body of the analysis service.
///
/// Unknown keys are kept in `extra` so a saved analysis matches what the
/// service returned.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub referenced_acts: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sections: Option<Vec<Section>>,
    /// Legacy shape, only meaningful when `sections` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amended_sections: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amendment_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AnalysisResult {
    /// Whether the response uses the legacy amendments-only shape.
    pub fn is_legacy(&self) -> bool {
        self.sections.is_none() && self.amended_sections.is_some()
    }
}
