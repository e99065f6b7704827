use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Label used for chunks that carry no title of their own.
pub const FALLBACK_TITLE: &str = "Microsoft Documentation";

/// Value of [`SearchResponse::response_source`].
pub const RESPONSE_SOURCE: &str = "Microsoft Learn MCP Server";

/// Incoming search request. `query` is optional so that a missing field is
/// reported as a bad request rather than a deserialization failure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub query: Option<String>,
}

/// One normalized unit of documentation content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationChunk {
    pub title: String,
    pub content: String,
    pub content_url: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: Option<Map<String, Value>>,
}

/// Response envelope returned by the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub query: String,
    pub search_timestamp: DateTime<Utc>,
    pub documentation_chunks: Vec<DocumentationChunk>,
    pub total_chunks: usize,
    pub total_characters: usize,
    pub response_source: String,
    pub error_message: Option<String>,
}

impl SearchResponse {
    /// Builds an envelope whose aggregate counts are derived from `chunks`.
    pub fn new(
        query: impl Into<String>,
        search_timestamp: DateTime<Utc>,
        chunks: Vec<DocumentationChunk>,
    ) -> Self {
        let total_characters = chunks.iter().map(|c| c.content.chars().count()).sum();
        Self {
            query: query.into(),
            search_timestamp,
            total_chunks: chunks.len(),
            total_characters,
            documentation_chunks: chunks,
            response_source: RESPONSE_SOURCE.to_string(),
            error_message: None,
        }
    }
}
