use anyhow::{Context, Result};
use std::path::Path;

const STARTER_CONFIG: &str = r#"# Minimal Universal Context Protocol gateway config.
# See SPEC_FULL.md §10.3 for every field and its default.

server:
  transport: stdio
  http_bind: "127.0.0.1:8642"

tool_zoo:
  db_path: "ucp-zoo.db"

session:
  db_path: "ucp-sessions.db"

telemetry:
  directory: "telemetry"

downstream_servers:
  - name: example
    transport: stdio
    command: "example-mcp-server"
    args: []
    description: "Replace with a real downstream MCP server."
"#;

/// Writes a minimal starter config to `path`. Refuses to overwrite an
/// existing file.
pub fn run(path: &Path) -> Result<()> {
    if path.exists() {
        anyhow::bail!("refusing to overwrite existing file at {}", path.display());
    }
    std::fs::write(path, STARTER_CONFIG)
        .with_context(|| format!("writing starter config to {}", path.display()))?;
    println!("wrote starter config to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_core::config::GatewayConfig;

    #[test]
    fn writes_config_that_round_trips_through_loading() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ucp-gateway.yaml");

        run(&path).unwrap();

        let config = GatewayConfig::load(&path).unwrap();
        assert_eq!(config.downstream_servers.len(), 1);
        assert_eq!(config.downstream_servers[0].name, "example");
    }

    #[test]
    fn refuses_to_overwrite_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ucp-gateway.yaml");
        std::fs::write(&path, "pre-existing").unwrap();

        let err = run(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));
    }
}
