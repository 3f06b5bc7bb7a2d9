use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use rmcp::transport::streamable_http_server::session::local::LocalSessionManager;
use rmcp::transport::streamable_http_server::{StreamableHttpServerConfig, StreamableHttpService};
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::context::GatewayContext;
use crate::mcp::UcpGatewayServer;

async fn health() -> &'static str {
    "ok"
}

async fn status(State(ctx): State<Arc<GatewayContext>>) -> Json<Vec<ucp_pool::ServerStatus>> {
    Json(ctx.pool.status())
}

async fn metrics() -> String {
    ucp_telemetry::metrics::render().unwrap_or_default()
}

/// Builds the HTTP surface: health, status, Prometheus metrics, and the
/// streamable-HTTP MCP transport mounted at `/mcp` (§4.5, §6).
pub fn build_router(ctx: Arc<GatewayContext>) -> Router {
    let service_ctx = ctx.clone();
    let service_factory = move || Ok(UcpGatewayServer::new(service_ctx.clone()));

    let mcp_service = StreamableHttpService::new(
        service_factory,
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig {
            sse_keep_alive: Some(std::time::Duration::from_secs(15)),
            stateful_mode: true,
            cancellation_token: CancellationToken::new(),
        },
    );

    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/metrics", get(metrics))
        .with_state(ctx)
        .nest_service("/mcp", mcp_service)
        .layer(TraceLayer::new_for_http())
}
