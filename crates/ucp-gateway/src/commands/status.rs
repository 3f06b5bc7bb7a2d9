use anyhow::Result;
use ucp_core::config::GatewayConfig;
use ucp_pool::ServerStatus;

use crate::context::GatewayContext;

/// Prints Connection Pool and circuit breaker status. Tries a running
/// instance's HTTP `/status` endpoint first; if none is listening, falls
/// back to building the pool fresh and reporting its (disconnected) state.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let url = format!("http://{}/status", config.server.http_bind);
    match reqwest::get(&url).await {
        Ok(resp) if resp.status().is_success() => {
            let statuses: Vec<ServerStatus> = resp.json().await?;
            print_statuses(&statuses);
        }
        _ => {
            tracing::info!("no running instance reachable at {url}, reporting fresh pool state");
            let ctx = GatewayContext::build(config).await?;
            print_statuses(&ctx.pool.status());
        }
    }
    Ok(())
}

fn print_statuses(statuses: &[ServerStatus]) {
    for status in statuses {
        println!(
            "{:<20} connection={:<12} breaker={:<10} tools={:<4} last_error={}",
            status.name,
            status.connection.to_string(),
            status.breaker.to_string(),
            status.tool_count,
            status.last_error.as_deref().unwrap_or("-"),
        );
    }
}
