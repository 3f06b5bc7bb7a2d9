mod cli;
mod commands;
mod context;
mod http;
mod logging;
mod mcp;

use clap::Parser;
use cli::{Cli, Commands};
use ucp_core::config::GatewayConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    logging::init(cli.log_format);

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "ucp-gateway exited with an error");
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Commands::InitConfig { path } = &cli.command {
        return commands::run_init_config(path);
    }

    let config = GatewayConfig::load(&cli.config)?;

    match cli.command {
        Commands::Serve => commands::run_serve(config).await,
        Commands::Index => commands::run_index(config).await,
        Commands::Search { query, top_k } => commands::run_search(config, query, top_k).await,
        Commands::Status => commands::run_status(config).await,
        Commands::InitConfig { .. } => unreachable!("handled above"),
    }
}
