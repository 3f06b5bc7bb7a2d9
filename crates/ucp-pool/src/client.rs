//! Spawns a downstream MCP client session over stdio or HTTP.

use crate::error::{PoolError, Result};
use rmcp::model::ClientInfo;
use rmcp::service::RunningService;
use rmcp::transport::child_process::TokioChildProcess;
use rmcp::transport::streamable_http_client::StreamableHttpClientTransportConfig;
use rmcp::transport::StreamableHttpClientTransport;
use rmcp::{serve_client, RoleClient};
use std::process::Stdio;
use tokio::process::Command;
use ucp_core::server::{AuthConfig, ServerDescriptor, Transport};

fn client_info() -> ClientInfo {
    ClientInfo {
        meta: None,
        protocol_version: Default::default(),
        capabilities: Default::default(),
        client_info: rmcp::model::Implementation {
            name: "ucp-gateway".into(),
            title: Some("Universal Context Protocol Gateway".into()),
            version: env!("CARGO_PKG_VERSION").into(),
            icons: None,
            website_url: None,
        },
    }
}

fn bearer_header(descriptor: &ServerDescriptor) -> Option<String> {
    match descriptor.auth.as_ref()? {
        AuthConfig::Bearer { token } => Some(format!("Bearer {token}")),
        _ => None,
    }
}

pub async fn connect(
    descriptor: &ServerDescriptor,
) -> Result<RunningService<RoleClient, ClientInfo>> {
    match descriptor.transport {
        Transport::Stdio => connect_stdio(descriptor).await,
        Transport::Http => connect_http(descriptor).await,
    }
}

async fn connect_stdio(
    descriptor: &ServerDescriptor,
) -> Result<RunningService<RoleClient, ClientInfo>> {
    let command = descriptor
        .command
        .as_ref()
        .ok_or_else(|| PoolError::Connect {
            server: descriptor.name.clone(),
            message: "stdio transport requires a command".to_string(),
        })?;

    let mut cmd = Command::new(command);
    cmd.args(&descriptor.args);
    for (key, value) in &descriptor.env {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());

    let transport = TokioChildProcess::new(cmd).map_err(|e| PoolError::Connect {
        server: descriptor.name.clone(),
        message: e.to_string(),
    })?;

    serve_client(client_info(), transport)
        .await
        .map_err(|e| PoolError::Connect {
            server: descriptor.name.clone(),
            message: e.to_string(),
        })
}

async fn connect_http(
    descriptor: &ServerDescriptor,
) -> Result<RunningService<RoleClient, ClientInfo>> {
    let url = descriptor.url.as_ref().ok_or_else(|| PoolError::Connect {
        server: descriptor.name.clone(),
        message: "http transport requires a url".to_string(),
    })?;

    let mut config = StreamableHttpClientTransportConfig::with_uri(url.as_str());
    if let Some(auth_header) = bearer_header(descriptor) {
        config = config.auth_header(auth_header);
    }

    let transport = StreamableHttpClientTransport::from_config(config);
    serve_client(client_info(), transport)
        .await
        .map_err(|e| PoolError::Connect {
            server: descriptor.name.clone(),
            message: e.to_string(),
        })
}
