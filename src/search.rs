use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::SearchError;
use crate::invoker::{SEARCH_TOOL_NAME, ToolInvoker};
use crate::models::SearchResponse;
use crate::normalizer::normalize;
use crate::registry::EndpointRegistry;
use crate::sanitizer::sanitize;

/// Runs one search: sanitize, call the remote tool once, normalize.
#[derive(Clone)]
pub struct DocsSearchService {
    invoker: Arc<dyn ToolInvoker>,
    registry: EndpointRegistry,
    endpoint_name: String,
}

impl DocsSearchService {
    /// # Arguments
    /// * `invoker` - Boundary used to reach the remote tool
    /// * `registry` - Endpoint configurations, shared with whoever registers them
    /// * `endpoint_name` - Registry entry searched against
    pub fn new(
        invoker: Arc<dyn ToolInvoker>,
        registry: EndpointRegistry,
        endpoint_name: impl Into<String>,
    ) -> Self {
        Self {
            invoker,
            registry,
            endpoint_name: endpoint_name.into(),
        }
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    /// Searches the documentation endpoint for `query`.
    ///
    /// # Errors
    /// * [`SearchError::InvalidArgument`] for a blank query
    /// * [`SearchError::ToolUnavailable`] if the endpoint is unknown or lacks the search tool
    /// * [`SearchError::InvocationFailed`] if the remote call fails
    pub async fn search(&self, query: &str) -> Result<SearchResponse, SearchError> {
        let sanitized = sanitize(query)?;

        let endpoint = self.registry.get(&self.endpoint_name).await.ok_or_else(|| {
            tracing::error!("No endpoint registered under '{}'", self.endpoint_name);
            SearchError::ToolUnavailable {
                tool: SEARCH_TOOL_NAME.to_string(),
                endpoint: self.endpoint_name.clone(),
            }
        })?;

        let mut params = Map::new();
        params.insert("question".to_string(), Value::String(sanitized.to_string()));

        let payloads = self.invoker.invoke(&endpoint, SEARCH_TOOL_NAME, params).await?;
        Ok(normalize(&payloads, query, endpoint.url.as_str()))
    }
}

impl std::fmt::Debug for DocsSearchService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocsSearchService")
            .field("endpoint_name", &self.endpoint_name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use url::Url;

    const ENDPOINT_URL: &str = "https://learn.example.com/api/mcp";

    /// Records every call and answers with canned data.
    struct RecordingInvoker {
        tools: Vec<String>,
        payloads: Vec<String>,
        calls: Mutex<Vec<Map<String, Value>>>,
    }

    impl RecordingInvoker {
        fn new(tools: &[&str], payloads: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                tools: tools.iter().map(|s| s.to_string()).collect(),
                payloads: payloads.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ToolInvoker for RecordingInvoker {
        async fn list_tools(&self, _endpoint: &EndpointConfig) -> Result<Vec<String>, SearchError> {
            Ok(self.tools.clone())
        }

        async fn call_tool(
            &self,
            _endpoint: &EndpointConfig,
            _tool_name: &str,
            params: Map<String, Value>,
        ) -> Result<Vec<String>, SearchError> {
            self.calls.lock().unwrap().push(params);
            Ok(self.payloads.clone())
        }
    }

    fn service(invoker: Arc<RecordingInvoker>) -> DocsSearchService {
        let registry = EndpointRegistry::with_endpoint(EndpointConfig::new(
            "docs",
            Url::parse(ENDPOINT_URL).unwrap(),
        ));
        DocsSearchService::new(invoker, registry, "docs")
    }

    #[tokio::test]
    async fn test_search_end_to_end() {
        let invoker = RecordingInvoker::new(
            &[SEARCH_TOOL_NAME],
            &[r#"[{"title":"T1","content":"C1","contentUrl":"U1"}]"#],
        );
        let response = service(invoker.clone())
            .search("Azure Functions deployment")
            .await
            .unwrap();

        assert_eq!(response.total_chunks, 1);
        assert_eq!(response.total_characters, 2);
        assert_eq!(response.documentation_chunks[0].title, "T1");
        assert_eq!(response.documentation_chunks[0].content_url, "U1");

        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["question"], Value::String("Azure Functions deployment".into()));
    }

    #[tokio::test]
    async fn test_forwards_sanitized_question_but_echoes_original_query() {
        let invoker = RecordingInvoker::new(&[SEARCH_TOOL_NAME], &["plain text"]);
        let response = service(invoker.clone()).search("  <b>blob</b> storage ").await.unwrap();

        assert_eq!(response.query, "  <b>blob</b> storage ");
        assert_eq!(response.documentation_chunks[0].content_url, ENDPOINT_URL);
        let calls = invoker.calls.lock().unwrap();
        assert_eq!(calls[0]["question"], Value::String("bblob/b storage".into()));
    }

    #[tokio::test]
    async fn test_error_notice_payload_yields_empty_envelope() {
        let invoker = RecordingInvoker::new(&[SEARCH_TOOL_NAME], &["An error occurred while fetching"]);
        let response = service(invoker).search("q").await.unwrap();
        assert_eq!(response.total_chunks, 0);
        assert_eq!(response.total_characters, 0);
    }

    #[tokio::test]
    async fn test_missing_tool_is_reported() {
        let invoker = RecordingInvoker::new(&["some_other_tool"], &[]);
        match service(invoker.clone()).search("q").await {
            Err(SearchError::ToolUnavailable { tool, .. }) => assert_eq!(tool, SEARCH_TOOL_NAME),
            other => panic!("Expected ToolUnavailable, got {other:?}"),
        }
        assert!(invoker.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_endpoint_is_reported() {
        let invoker = RecordingInvoker::new(&[SEARCH_TOOL_NAME], &[]);
        let search = DocsSearchService::new(invoker, EndpointRegistry::new(), "docs");
        assert!(matches!(search.search("q").await, Err(SearchError::ToolUnavailable { .. })));
    }

    #[tokio::test]
    async fn test_blank_query_never_reaches_invoker() {
        let invoker = RecordingInvoker::new(&[SEARCH_TOOL_NAME], &[]);
        assert!(matches!(
            service(invoker.clone()).search("   ").await,
            Err(SearchError::InvalidArgument(_))
        ));
        assert!(invoker.calls.lock().unwrap().is_empty());
    }
}
