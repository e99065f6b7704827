//! Query sanitization applied before a query leaves the service.
//!
//! This is a denylist: it removes a handful of markup/quote characters and
//! caps the length. It does not escape or encode anything else.

use std::fmt;

use crate::error::SearchError;

/// Maximum number of characters forwarded to the remote tool.
pub const MAX_QUERY_CHARS: usize = 500;

const DENYLIST: [char; 4] = ['<', '>', '"', '\''];

/// A query that went through [`sanitize`].
///
/// Holds at most [`MAX_QUERY_CHARS`] characters and none of `< > " '`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedQuery(String);

impl SanitizedQuery {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for SanitizedQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SanitizedQuery {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims the query, strips denylisted characters and truncates it.
///
/// # Errors
/// Returns [`SearchError::InvalidArgument`] when the query is blank, or when
/// nothing is left once the denylisted characters are removed.
pub fn sanitize(query: &str) -> Result<SanitizedQuery, SearchError> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(SearchError::InvalidArgument(
            "Query cannot be empty".to_string(),
        ));
    }

    let sanitized: String = trimmed
        .chars()
        .filter(|c| !DENYLIST.contains(c))
        .take(MAX_QUERY_CHARS)
        .collect();

    // `"<>"` passes the blank check but leaves nothing to search for.
    if sanitized.trim().is_empty() {
        return Err(SearchError::InvalidArgument(
            "Query contains no searchable characters".to_string(),
        ));
    }

    tracing::debug!(
        original_len = query.chars().count(),
        sanitized_len = sanitized.chars().count(),
        "Sanitized search query"
    );

    Ok(SanitizedQuery(sanitized))
}
