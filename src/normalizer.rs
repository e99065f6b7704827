//! Turns raw tool payloads into a [`SearchResponse`].
//!
//! A payload is either a JSON array of documentation objects or free text.
//! Free text is kept as a single chunk instead of failing the search, and
//! individual array elements that cannot be used are skipped.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{DocumentationChunk, FALLBACK_TITLE, SearchResponse};

/// Result of trying to read a payload as a JSON array of documentation objects.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedPayload {
    /// The payload was a JSON array; holds the chunks that survived extraction.
    Parsed(Vec<DocumentationChunk>),
    /// The payload was not a JSON array and is carried through as text.
    Unparsed(String),
}

#[derive(Debug, Error)]
enum ElementError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
}

/// Reads one raw payload without ever failing.
///
/// # Arguments
/// * `payload` - Raw text returned by the tool
/// * `source_endpoint` - URL used when an element carries no `contentUrl`
/// * `captured_at` - Timestamp stamped on every produced chunk
pub fn parse_payload(
    payload: &str,
    source_endpoint: &str,
    captured_at: DateTime<Utc>,
) -> ParsedPayload {
    let elements = match serde_json::from_str::<Vec<Value>>(payload) {
        Ok(elements) => elements,
        Err(err) => {
            tracing::debug!("Payload is not a JSON array ({err}), keeping it as plain text");
            return ParsedPayload::Unparsed(payload.to_string());
        }
    };

    let mut chunks = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        match chunk_from_element(element, source_endpoint, captured_at) {
            Ok(Some(chunk)) => chunks.push(chunk),
            Ok(None) => tracing::debug!(index, "Dropping documentation entry without content"),
            Err(err) => tracing::warn!(index, "Skipping unexpected payload element: {err}"),
        }
    }
    ParsedPayload::Parsed(chunks)
}

/// Normalizes every payload, in order, into one response envelope.
pub fn normalize(raw_payloads: &[String], original_query: &str, source_endpoint: &str) -> SearchResponse {
    let captured_at = Utc::now();
    let mut chunks = Vec::new();

    for payload in raw_payloads {
        match parse_payload(payload, source_endpoint, captured_at) {
            ParsedPayload::Parsed(parsed) => chunks.extend(parsed),
            ParsedPayload::Unparsed(text) => {
                chunks.push(fallback_chunk(text, source_endpoint, captured_at))
            }
        }
    }

    let response = SearchResponse::new(original_query, captured_at, chunks);
    tracing::info!(
        payloads = raw_payloads.len(),
        chunks = response.total_chunks,
        characters = response.total_characters,
        "Normalized search payloads"
    );
    response
}

fn chunk_from_element(
    element: &Value,
    source_endpoint: &str,
    captured_at: DateTime<Utc>,
) -> Result<Option<DocumentationChunk>, ElementError> {
    let object = element
        .as_object()
        .ok_or_else(|| ElementError::NotAnObject(json_kind(element)))?;

    let content = match string_field(object, "content") {
        Some(content) if !content.is_empty() => content,
        _ => return Ok(None),
    };

    Ok(Some(DocumentationChunk {
        title: string_field(object, "title").unwrap_or(FALLBACK_TITLE).to_string(),
        content: content.to_string(),
        content_url: string_field(object, "contentUrl")
            .unwrap_or(source_endpoint)
            .to_string(),
        timestamp: captured_at,
        metadata: None,
    }))
}

fn fallback_chunk(text: String, source_endpoint: &str, captured_at: DateTime<Utc>) -> DocumentationChunk {
    DocumentationChunk {
        title: FALLBACK_TITLE.to_string(),
        content: text,
        content_url: source_endpoint.to_string(),
        timestamp: captured_at,
        metadata: None,
    }
}

// Only string values count; numbers, nulls etc. behave like a missing field.
fn string_field<'a>(object: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    object.get(key).and_then(Value::as_str)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENDPOINT: &str = "https://learn.microsoft.com/api/mcp";

    fn payloads(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extracts_chunks_from_json_array() {
        let raw = payloads(&[r#"[{"title":"T1","content":"C1","contentUrl":"U1"}]"#]);
        let response = normalize(&raw, "Azure Functions deployment", ENDPOINT);

        assert_eq!(response.query, "Azure Functions deployment");
        assert_eq!(response.total_chunks, 1);
        assert_eq!(response.total_characters, 2);
        let chunk = &response.documentation_chunks[0];
        assert_eq!(chunk.title, "T1");
        assert_eq!(chunk.content, "C1");
        assert_eq!(chunk.content_url, "U1");
        assert!(chunk.metadata.is_none());
    }

    #[test]
    fn test_drops_elements_without_content() {
        let raw = payloads(&[
            r#"[{"title":"no content"},{"title":"empty","content":""},{"content":"kept"}]"#,
        ]);
        let response = normalize(&raw, "q", ENDPOINT);

        assert_eq!(response.total_chunks, 1);
        assert_eq!(response.documentation_chunks[0].content, "kept");
    }

    #[test]
    fn test_applies_defaults_for_missing_or_non_string_fields() {
        let raw = payloads(&[r#"[{"content":"body","title":42,"contentUrl":null}]"#]);
        let response = normalize(&raw, "q", ENDPOINT);

        let chunk = &response.documentation_chunks[0];
        assert_eq!(chunk.title, FALLBACK_TITLE);
        assert_eq!(chunk.content_url, ENDPOINT);
    }

    #[test]
    fn test_non_string_content_is_dropped() {
        let raw = payloads(&[r#"[{"title":"T","content":{"nested":true}}]"#]);
        assert_eq!(normalize(&raw, "q", ENDPOINT).total_chunks, 0);
    }

    #[test]
    fn test_plain_text_becomes_single_fallback_chunk() {
        let raw = payloads(&["plain text result"]);
        let response = normalize(&raw, "q", ENDPOINT);

        assert_eq!(response.total_chunks, 1);
        let chunk = &response.documentation_chunks[0];
        assert_eq!(chunk.content, "plain text result");
        assert_eq!(chunk.title, FALLBACK_TITLE);
        assert_eq!(chunk.content_url, ENDPOINT);
        assert_eq!(response.total_characters, "plain text result".len());
    }

    #[test]
    fn test_json_that_is_not_an_array_is_kept_as_text() {
        let raw = r#"{"title":"T","content":"C"}"#;
        match parse_payload(raw, ENDPOINT, Utc::now()) {
            ParsedPayload::Unparsed(text) => assert_eq!(text, raw),
            other => panic!("Expected Unparsed, got {other:?}"),
        }
    }

    #[test]
    fn test_skips_unexpected_elements_and_keeps_going() {
        let raw = payloads(&[
            r#"["stray string", 7, {"content":"first"}, null, {"content":"second"}]"#,
            r#"[{"content":"third"}]"#,
        ]);
        let response = normalize(&raw, "q", ENDPOINT);

        let contents: Vec<_> = response
            .documentation_chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(contents, ["first", "second", "third"]);
    }

    #[test]
    fn test_preserves_payload_then_element_order() {
        let raw = payloads(&[
            r#"[{"content":"a"},{"content":"b"}]"#,
            "free text",
            r#"[{"content":"c"}]"#,
        ]);
        let response = normalize(&raw, "q", ENDPOINT);

        let contents: Vec<_> = response
            .documentation_chunks
            .iter()
            .map(|c| c.content.as_str())
            .collect();
        assert_eq!(contents, ["a", "b", "free text", "c"]);
    }

    #[test]
    fn test_aggregates_match_chunks() {
        let cases: Vec<Vec<String>> = vec![
            vec![],
            payloads(&["[]"]),
            payloads(&["x", r#"[{"content":"ü"},{"title":"skip"}]"#, "not [json"]),
            payloads(&[r#"[{"content":"1234567890"}]"#, r#"[{"content":"abc"}]"#]),
        ];
        for raw in cases {
            let response = normalize(&raw, "q", ENDPOINT);
            assert_eq!(response.total_chunks, response.documentation_chunks.len());
            let expected: usize = response
                .documentation_chunks
                .iter()
                .map(|c| c.content.chars().count())
                .sum();
            assert_eq!(response.total_characters, expected);
        }
    }

    #[test]
    fn test_empty_input_yields_empty_envelope() {
        let response = normalize(&[], "q", ENDPOINT);
        assert_eq!(response.total_chunks, 0);
        assert_eq!(response.total_characters, 0);
        assert!(response.error_message.is_none());
    }
}
