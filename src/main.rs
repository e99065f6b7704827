use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use url::Url;

use docs_search_gateway::config::{
    CacheSettings, DEFAULT_ENDPOINT_NAME, DEFAULT_ENDPOINT_URL, DEFAULT_SEARCH_PATH,
    DEFAULT_USER_AGENT, EndpointConfig, ServiceConfig, TransportKind,
};
use docs_search_gateway::server;

#[derive(Parser, Debug)]
#[command(version, about = "HTTP gateway for MCP documentation search")]
struct Cli {
    /// Address for the HTTP server
    #[arg(short, long, env = "DOCS_GATEWAY_ADDRESS", default_value = "127.0.0.1:8080")]
    address: SocketAddr,

    /// Route serving search requests
    #[arg(long, env = "DOCS_GATEWAY_SEARCH_PATH", default_value = DEFAULT_SEARCH_PATH)]
    search_path: String,

    /// Name the MCP endpoint is registered under
    #[arg(long, env = "DOCS_GATEWAY_ENDPOINT_NAME", default_value = DEFAULT_ENDPOINT_NAME)]
    endpoint_name: String,

    /// URL of the MCP endpoint
    #[arg(short, long, env = "DOCS_GATEWAY_ENDPOINT_URL", default_value = DEFAULT_ENDPOINT_URL)]
    endpoint_url: Url,

    /// Transport used to reach the MCP endpoint
    #[arg(short, long, value_enum, env = "DOCS_GATEWAY_TRANSPORT", default_value_t = TransportKind::StreamableHttp)]
    transport: TransportKind,

    /// Timeout for each remote operation, in seconds
    #[arg(long, env = "DOCS_GATEWAY_TIMEOUT_SECS", default_value_t = 30)]
    timeout_secs: u64,

    /// User-Agent sent to the MCP endpoint
    #[arg(long, env = "DOCS_GATEWAY_USER_AGENT", default_value = DEFAULT_USER_AGENT)]
    user_agent: String,

    /// Maximum retry attempts (accepted, not applied)
    #[arg(long, env = "DOCS_GATEWAY_MAX_RETRY_ATTEMPTS", default_value_t = 3)]
    max_retry_attempts: u32,

    /// Enable response caching (accepted, not applied)
    #[arg(long, env = "DOCS_GATEWAY_ENABLE_CACHING")]
    enable_caching: bool,

    /// Cache expiry in minutes (accepted, not applied)
    #[arg(long, env = "DOCS_GATEWAY_CACHE_EXPIRY_MINUTES", default_value_t = 60)]
    cache_expiry_minutes: u64,
}

impl Cli {
    fn into_config(self) -> ServiceConfig {
        let mut endpoint = EndpointConfig::new(self.endpoint_name, self.endpoint_url)
            .with_transport(self.transport)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_user_agent(self.user_agent);
        endpoint.max_retry_attempts = self.max_retry_attempts;

        ServiceConfig {
            address: self.address,
            search_path: self.search_path,
            endpoint,
            cache: CacheSettings {
                enable_caching: self.enable_caching,
                cache_expiry_minutes: self.cache_expiry_minutes,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    server::start_http_server(cli.into_config()).await
}
