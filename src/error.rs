use thiserror::Error;

/// Errors that can cross the search pipeline boundary.
///
/// Payload-shape problems never show up here: the normalizer absorbs them.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Tool '{tool}' is not available on endpoint '{endpoint}'")]
    ToolUnavailable { tool: String, endpoint: String },

    #[error("Tool invocation on endpoint '{endpoint}' failed: {source}")]
    InvocationFailed {
        endpoint: String,
        #[source]
        source: anyhow::Error,
    },
}

impl SearchError {
    pub(crate) fn invocation_failed(endpoint: &str, source: impl Into<anyhow::Error>) -> Self {
        SearchError::InvocationFailed {
            endpoint: endpoint.to_string(),
            source: source.into(),
        }
    }

    /// Whether the caller supplied bad input, as opposed to a server-side failure.
    pub fn is_client_error(&self) -> bool {
        matches!(self, SearchError::InvalidArgument(_))
    }
}
