use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{self, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServiceConfig;
use crate::error::SearchError;
use crate::invoker::McpToolInvoker;
use crate::models::{SearchRequest, SearchResponse};
use crate::registry::EndpointRegistry;
use crate::search::DocsSearchService;

/// Body of every 500 response. Details stay in the logs.
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred while searching documentation.";

impl IntoResponse for SearchError {
    fn into_response(self) -> Response {
        if self.is_client_error() {
            return (StatusCode::BAD_REQUEST, self.to_string()).into_response();
        }
        tracing::error!("Search failed: {:#}", anyhow::Error::new(self));
        (StatusCode::INTERNAL_SERVER_ERROR, GENERIC_ERROR_MESSAGE).into_response()
    }
}

pub fn create_router(search: DocsSearchService, search_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(search_path, post(search_handler).get(search_query_handler))
        .route("/health", get(health_handler))
        .with_state(search)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

pub async fn search_handler(
    State(search): State<DocsSearchService>,
    request: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<SearchResponse>, SearchError> {
    let query = match request {
        Ok(Json(request)) => request.query,
        Err(rejection) => {
            tracing::debug!("Rejected search body: {}", rejection);
            None
        }
    };
    run_search(&search, query).await
}

pub async fn search_query_handler(
    State(search): State<DocsSearchService>,
    request: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Json<SearchResponse>, SearchError> {
    let query = request.ok().and_then(|Query(request)| request.query);
    run_search(&search, query).await
}

pub async fn health_handler() -> &'static str {
    "OK"
}

async fn run_search(
    search: &DocsSearchService,
    query: Option<String>,
) -> Result<Json<SearchResponse>, SearchError> {
    let query = query.unwrap_or_default();
    if query.trim().is_empty() {
        return Err(SearchError::InvalidArgument(
            "Query cannot be empty".to_string(),
        ));
    }

    tracing::info!("Searching documentation for {:?}", query);
    let response = search.search(&query).await?;
    Ok(Json(response))
}

// start http server
pub async fn start_http_server(config: ServiceConfig) -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.validate()?;
    tracing::info!(
        enable_caching = config.cache.enable_caching,
        cache_expiry_minutes = config.cache.cache_expiry_minutes,
        max_retry_attempts = config.endpoint.max_retry_attempts,
        "Cache and retry settings are accepted but not applied"
    );

    let registry = EndpointRegistry::with_endpoint(config.endpoint.clone());
    let invoker = Arc::new(McpToolInvoker::new());
    let search = DocsSearchService::new(invoker.clone(), registry.clone(), config.endpoint.name.clone());
    let router = create_router(search, &config.search_path);

    let listener = tokio::net::TcpListener::bind(config.address).await?;
    tracing::info!(
        "Listening on {}, searching via {} at {}",
        listener.local_addr()?,
        config.endpoint.name,
        config.endpoint.url
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    tracing::info!("Shutting down");
    invoker.shutdown().await;
    registry.drain().await;
    Ok(())
}
