use anyhow::Result;
use ucp_core::config::GatewayConfig;
use ucp_zoo::SearchMode;

use crate::context::GatewayContext;

/// Runs one Tool Zoo search against the persisted index and prints the
/// results ranked by score.
pub async fn run(config: GatewayConfig, query: String, top_k: usize) -> Result<()> {
    let ctx = GatewayContext::build(config).await?;
    let results = ctx.zoo.search(&query, top_k, SearchMode::Hybrid).await?;

    if results.is_empty() {
        println!("no matching tools");
        return Ok(());
    }

    for (schema, score) in results {
        println!("{:.4}  {}  {}", score, schema.name, schema.description);
    }
    Ok(())
}
