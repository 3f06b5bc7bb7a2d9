use anyhow::Result;
use std::collections::BTreeSet;
use ucp_core::config::GatewayConfig;
use ucp_core::ToolSchema;

use crate::context::GatewayContext;

/// Connects to every downstream server once, converts its advertised tools
/// into `ToolSchema`s, and bulk-replaces the Tool Zoo index.
pub async fn run(config: GatewayConfig) -> Result<()> {
    let ctx = GatewayContext::build(config).await?;
    ctx.pool.connect_all().await;

    let mut schemas = Vec::new();
    for (server_name, tools) in ctx.pool.list_all_tools() {
        for tool in tools {
            let input_schema = serde_json::Value::Object(tool.input_schema.as_ref().clone());
            let description = tool.description.clone().unwrap_or_default().into_owned();
            schemas.push(ToolSchema::new(
                &server_name,
                tool.name.as_ref(),
                description,
                input_schema,
                BTreeSet::new(),
            ));
        }
    }

    let tool_count = schemas.len();
    ctx.zoo.index(schemas).await?;
    ctx.pool.disconnect_all();

    let stats = ctx.zoo.stats();
    tracing::info!(
        tool_count,
        per_server = ?stats.per_server_count,
        "tool zoo index rebuilt"
    );
    println!("indexed {tool_count} tools across {} server(s)", stats.per_server_count.len());
    Ok(())
}
