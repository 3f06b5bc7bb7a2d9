use tracing_subscriber::EnvFilter;

use crate::cli::LogFormat;

/// Initializes tracing to stderr, never stdout, since the `serve` command
/// puts the MCP JSON-RPC channel on stdout when using the stdio transport.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
