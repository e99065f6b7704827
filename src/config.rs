use std::net::SocketAddr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use url::Url;

/// Name under which the configured endpoint is registered.
pub const DEFAULT_ENDPOINT_NAME: &str = "microsoft-learn";
pub const DEFAULT_ENDPOINT_URL: &str = "https://learn.microsoft.com/api/mcp";
pub const DEFAULT_SEARCH_PATH: &str = "/api/docs/search";
pub const DEFAULT_USER_AGENT: &str = concat!("docs-search-gateway/", env!("CARGO_PKG_VERSION"));

/// Wire transport used to reach an MCP endpoint.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum TransportKind {
    /// Streamable HTTP transport
    #[default]
    StreamableHttp,
    /// Server-sent events transport
    Sse,
}

/// Connection settings for one MCP endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub name: String,
    pub url: Url,
    pub transport: TransportKind,
    pub timeout: Duration,
    pub user_agent: String,
    /// Accepted for compatibility; no retry loop reads it.
    pub max_retry_attempts: u32,
}

impl EndpointConfig {
    pub fn new(name: impl Into<String>, url: Url) -> Self {
        Self {
            name: name.into(),
            url,
            transport: TransportKind::default(),
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_retry_attempts: 3,
        }
    }

    pub fn with_transport(mut self, transport: TransportKind) -> Self {
        self.transport = transport;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Cache settings that are parsed and reported but drive no behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    pub enable_caching: bool,
    pub cache_expiry_minutes: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enable_caching: false,
            cache_expiry_minutes: 60,
        }
    }
}

/// Everything the HTTP server needs to start.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub address: SocketAddr,
    pub search_path: String,
    pub endpoint: EndpointConfig,
    pub cache: CacheSettings,
}

impl ServiceConfig {
    /// Checks values that clap cannot validate on its own.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.search_path.starts_with('/') {
            anyhow::bail!("search path must start with '/': {}", self.search_path);
        }
        if !matches!(self.endpoint.url.scheme(), "http" | "https") {
            anyhow::bail!("endpoint URL must be http(s): {}", self.endpoint.url);
        }
        if self.endpoint.timeout.is_zero() {
            anyhow::bail!("endpoint timeout must be greater than zero");
        }
        Ok(())
    }
}
