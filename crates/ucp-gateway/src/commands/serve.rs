use std::sync::Arc;

use anyhow::Result;
use ucp_core::config::{GatewayConfig, TransportMode};

use crate::context::GatewayContext;
use crate::http;
use crate::mcp::UcpGatewayServer;

/// Connects to every downstream server, then serves the MCP endpoint on the
/// configured transport until a shutdown signal arrives (§4.5, §5).
pub async fn run(config: GatewayConfig) -> Result<()> {
    ucp_telemetry::metrics::install();
    let transport = config.server.transport.clone();
    let ctx = Arc::new(GatewayContext::build(config).await?);
    ctx.pool.connect_all().await;

    match transport {
        TransportMode::Stdio => run_stdio(ctx).await,
        TransportMode::Http => run_http(ctx).await,
    }
}

async fn run_stdio(ctx: Arc<GatewayContext>) -> Result<()> {
    let server = UcpGatewayServer::new(ctx.clone());
    let transport = rmcp::transport::io::stdio();
    let service = rmcp::serve_server(server, transport).await?;
    service.waiting().await?;
    ctx.pool.disconnect_all();
    Ok(())
}

async fn run_http(ctx: Arc<GatewayContext>) -> Result<()> {
    let bind = ctx.config.server.http_bind.clone();
    let router = http::build_router(ctx.clone());
    let listener = tokio::net::TcpListener::bind(&bind).await?;
    tracing::info!(%bind, "serving MCP over streamable HTTP");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    ctx.pool.disconnect_all();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
