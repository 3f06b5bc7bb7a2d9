use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ucp-gateway")]
#[command(about = "Universal Context Protocol gateway")]
#[command(version)]
pub struct Cli {
    /// Path to the gateway config file.
    #[arg(short, long, global = true, default_value = "ucp-gateway.yaml")]
    pub config: PathBuf,

    /// Log output format.
    #[arg(long, global = true, env = "UCP_LOG_FORMAT", default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Connect to every downstream server, run the MCP endpoint, and serve
    /// tool calls until shut down.
    Serve,

    /// Connect to every downstream server once, populate the Tool Zoo, and
    /// exit.
    Index,

    /// Run one Tool Zoo search against the persisted index and print the
    /// results.
    Search {
        /// Natural-language query to search for.
        query: String,

        /// Maximum number of results to print.
        #[arg(long, default_value_t = 10)]
        top_k: usize,
    },

    /// Print Connection Pool and circuit breaker status, either from a
    /// running instance's HTTP status endpoint or from persisted state.
    Status,

    /// Write a minimal starter config file to the given path.
    InitConfig {
        /// Destination path for the generated config.
        #[arg(default_value = "ucp-gateway.yaml")]
        path: PathBuf,
    },
}
