//! Remote tool invocation over the Model Context Protocol.
//!
//! The rest of the crate only sees the [`ToolInvoker`] trait. [`McpToolInvoker`]
//! is the production implementation: it keeps one connected `rmcp` client per
//! endpoint and releases all of them on [`McpToolInvoker::shutdown`].
//!
//! # Example
//! ```no_run
//! use docs_search_gateway::config::{DEFAULT_ENDPOINT_NAME, EndpointConfig};
//! use docs_search_gateway::invoker::{McpToolInvoker, SEARCH_TOOL_NAME, ToolInvoker};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let endpoint = EndpointConfig::new(
//!         DEFAULT_ENDPOINT_NAME,
//!         "https://learn.microsoft.com/api/mcp".parse()?,
//!     );
//!     let invoker = McpToolInvoker::new();
//!     let params = serde_json::json!({ "question": "Azure Functions deployment" });
//!     let payloads = invoker
//!         .invoke(&endpoint, SEARCH_TOOL_NAME, params.as_object().cloned().unwrap_or_default())
//!         .await?;
//!     println!("{} payloads", payloads.len());
//!     invoker.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::anyhow;
use async_trait::async_trait;
use rmcp::model::{
    CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation, ProtocolVersion,
};
use rmcp::service::RunningService;
use rmcp::transport::sse_client::SseClientConfig;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::{SseClientTransport, StreamableHttpClientTransport};
use rmcp::{RoleClient, ServiceExt};
use serde_json::{Map, Value};
use tokio::sync::Mutex;

use crate::config::{EndpointConfig, TransportKind};
use crate::error::SearchError;

/// Name of the documentation search tool advertised by the remote endpoint.
pub const SEARCH_TOOL_NAME: &str = "microsoft_docs_search";

const ERROR_PREFIX: &str = "An error occurred";

/// Boundary to the remote tool endpoint.
#[async_trait]
pub trait ToolInvoker: Send + Sync {
    /// Names of the tools the endpoint advertises.
    async fn list_tools(&self, endpoint: &EndpointConfig) -> Result<Vec<String>, SearchError>;

    /// Calls `tool_name` once and returns the raw text of every content item.
    async fn call_tool(
        &self,
        endpoint: &EndpointConfig,
        tool_name: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<String>, SearchError>;

    /// Checks that `tool_name` is advertised, calls it, and drops noise payloads.
    ///
    /// # Errors
    /// * [`SearchError::ToolUnavailable`] if the endpoint does not list the tool
    /// * [`SearchError::InvocationFailed`] on transport or protocol failure
    async fn invoke(
        &self,
        endpoint: &EndpointConfig,
        tool_name: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<String>, SearchError> {
        let tools = self.list_tools(endpoint).await?;
        if !tools.iter().any(|name| name == tool_name) {
            tracing::warn!(
                "Tool '{}' not advertised by '{}', available: {:?}",
                tool_name,
                endpoint.name,
                tools
            );
            return Err(SearchError::ToolUnavailable {
                tool: tool_name.to_string(),
                endpoint: endpoint.name.clone(),
            });
        }

        let raw = self.call_tool(endpoint, tool_name, params).await?;
        let received = raw.len();
        let payloads = filter_payloads(raw);
        tracing::debug!(received, kept = payloads.len(), "Tool '{}' returned payloads", tool_name);
        Ok(payloads)
    }
}

/// Drops blank fragments and fragments that are error notices rather than content.
pub fn filter_payloads(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    raw.into_iter()
        .filter(|text| !text.trim().is_empty() && !is_error_notice(text))
        .collect()
}

fn is_error_notice(text: &str) -> bool {
    text.trim_start()
        .get(..ERROR_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(ERROR_PREFIX))
}

type McpClient = RunningService<RoleClient, ClientInfo>;

struct CachedClient {
    // Settings the client was opened with; a re-registered endpoint gets a new client.
    config: EndpointConfig,
    client: Arc<McpClient>,
}

/// [`ToolInvoker`] backed by `rmcp` clients, cached per endpoint name.
#[derive(Default)]
pub struct McpToolInvoker {
    clients: Mutex<HashMap<String, CachedClient>>,
}

impl std::fmt::Debug for McpToolInvoker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolInvoker").finish_non_exhaustive()
    }
}

impl McpToolInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently cached clients.
    pub async fn cached_clients(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Closes every cached client.
    ///
    /// Clients still used by an in-flight call are closed once that call
    /// releases them.
    pub async fn shutdown(&self) {
        let drained: Vec<(String, CachedClient)> = self.clients.lock().await.drain().collect();
        for (name, cached) in drained {
            match Arc::try_unwrap(cached.client) {
                Ok(client) => match client.cancel().await {
                    Ok(reason) => tracing::info!("Closed MCP client '{}': {:?}", name, reason),
                    Err(e) => tracing::warn!("Failed to close MCP client '{}': {}", name, e),
                },
                Err(_) => tracing::info!("MCP client '{}' still in use, closing on release", name),
            }
        }
    }

    async fn acquire(&self, endpoint: &EndpointConfig) -> Result<Arc<McpClient>, SearchError> {
        if let Some(cached) = self.clients.lock().await.get(&endpoint.name) {
            if cached.config == *endpoint {
                return Ok(cached.client.clone());
            }
        }

        let client = Arc::new(connect(endpoint).await?);
        self.clients.lock().await.insert(
            endpoint.name.clone(),
            CachedClient {
                config: endpoint.clone(),
                client: client.clone(),
            },
        );
        Ok(client)
    }

    /// Forgets `client` so the next request reconnects.
    async fn evict(&self, endpoint: &EndpointConfig, client: &Arc<McpClient>) {
        let mut clients = self.clients.lock().await;
        if clients
            .get(&endpoint.name)
            .is_some_and(|cached| Arc::ptr_eq(&cached.client, client))
        {
            clients.remove(&endpoint.name);
            tracing::info!("Evicted MCP client '{}' after a failed call", endpoint.name);
        }
    }
}

#[async_trait]
impl ToolInvoker for McpToolInvoker {
    async fn list_tools(&self, endpoint: &EndpointConfig) -> Result<Vec<String>, SearchError> {
        let client = self.acquire(endpoint).await?;
        let result = with_timeout(endpoint, async {
            client
                .list_all_tools()
                .await
                .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))
        })
        .await;

        match result {
            Ok(tools) => Ok(tools.into_iter().map(|tool| tool.name.to_string()).collect()),
            Err(err) => {
                self.evict(endpoint, &client).await;
                Err(err)
            }
        }
    }

    async fn call_tool(
        &self,
        endpoint: &EndpointConfig,
        tool_name: &str,
        params: Map<String, Value>,
    ) -> Result<Vec<String>, SearchError> {
        let client = self.acquire(endpoint).await?;
        tracing::info!("Calling tool '{}' on '{}'", tool_name, endpoint.url);

        let request = CallToolRequestParam {
            name: tool_name.to_string().into(),
            arguments: Some(params),
        };
        let result = with_timeout(endpoint, async {
            client
                .call_tool(request)
                .await
                .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))
        })
        .await;

        let result = match result {
            Ok(result) => result,
            Err(err) => {
                self.evict(endpoint, &client).await;
                return Err(err);
            }
        };

        if result.is_error == Some(true) {
            tracing::warn!("Tool '{}' reported an error result", tool_name);
        }

        Ok(result
            .content
            .iter()
            .filter_map(|content| content.as_text().map(|text| text.text.clone()))
            .collect())
    }
}

async fn with_timeout<T>(
    endpoint: &EndpointConfig,
    fut: impl Future<Output = Result<T, SearchError>>,
) -> Result<T, SearchError> {
    tokio::time::timeout(endpoint.timeout, fut)
        .await
        .unwrap_or_else(|_| {
            Err(SearchError::invocation_failed(
                &endpoint.name,
                anyhow!("timed out after {:?}", endpoint.timeout),
            ))
        })
}

async fn connect(endpoint: &EndpointConfig) -> Result<McpClient, SearchError> {
    tracing::info!(
        "Connecting to MCP endpoint '{}' at {} ({:?})",
        endpoint.name,
        endpoint.url,
        endpoint.transport
    );

    // No request timeout on the HTTP client: it would cut long-lived event streams.
    let http = reqwest::Client::builder()
        .user_agent(endpoint.user_agent.as_str())
        .connect_timeout(endpoint.timeout)
        .build()
        .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))?;

    let client_info = ClientInfo {
        protocol_version: ProtocolVersion::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation::from_build_env(),
    };

    with_timeout(endpoint, async {
        match endpoint.transport {
            TransportKind::StreamableHttp => {
                let transport = StreamableHttpClientTransport::with_client(
                    http,
                    StreamableHttpClientTransportConfig::with_uri(endpoint.url.as_str()),
                );
                client_info
                    .serve(transport)
                    .await
                    .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))
            }
            TransportKind::Sse => {
                let transport = SseClientTransport::start_with_client(
                    http,
                    SseClientConfig {
                        sse_endpoint: endpoint.url.as_str().into(),
                        ..Default::default()
                    },
                )
                .await
                .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))?;
                client_info
                    .serve(transport)
                    .await
                    .map_err(|e| SearchError::invocation_failed(&endpoint.name, e))
            }
        }
    })
    .await
}
