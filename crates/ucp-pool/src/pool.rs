use crate::client;
use crate::error::{PoolError, Result};
use crate::runtime::{ConnectedSession, ServerRuntime};
use parking_lot::Mutex;
use rmcp::model::{CallToolRequestParams, CallToolResult};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use ucp_core::config::PoolConfig;
use ucp_core::server::{BreakerState, ConnectionState, ServerDescriptor};

#[derive(Debug, Clone, serde::Serialize)]
pub struct ServerStatus {
    pub name: String,
    pub connection: ConnectionState,
    pub breaker: BreakerState,
    pub tool_count: usize,
    pub last_error: Option<String>,
}

/// Owns one session per configured downstream server and wraps every call in
/// retry, timeout and circuit-breaker logic (§4.3, §5).
pub struct ConnectionPool {
    descriptors: HashMap<String, ServerDescriptor>,
    runtimes: HashMap<String, Mutex<ServerRuntime>>,
    config: PoolConfig,
}

impl ConnectionPool {
    pub fn new(descriptors: Vec<ServerDescriptor>, config: PoolConfig) -> Self {
        let mut runtimes = HashMap::new();
        let mut by_name = HashMap::new();
        for descriptor in descriptors {
            runtimes.insert(descriptor.name.clone(), Mutex::new(ServerRuntime::default()));
            by_name.insert(descriptor.name.clone(), descriptor);
        }
        Self {
            descriptors: by_name,
            runtimes,
            config,
        }
    }

    fn descriptor(&self, server_name: &str) -> Result<&ServerDescriptor> {
        self.descriptors
            .get(server_name)
            .ok_or_else(|| PoolError::UnknownServer(server_name.to_string()))
    }

    fn backoff_for(&self, attempt: u32) -> Duration {
        let secs = self.config.base_backoff_secs * 2f64.powi(attempt as i32);
        Duration::from_secs_f64(secs)
    }

    /// Connect to every configured server. A single server's failure is
    /// logged and left in `Error`/breaker-tripped state; it never prevents
    /// the others from connecting.
    pub async fn connect_all(&self) {
        let names: Vec<String> = self.descriptors.keys().cloned().collect();
        for name in names {
            if let Err(e) = self.connect_one(&name).await {
                tracing::warn!(server = %name, error = %e, "failed to connect downstream server");
            }
        }
    }

    async fn connect_one(&self, server_name: &str) -> Result<()> {
        let descriptor = self.descriptor(server_name)?;
        {
            let mut runtime = self.runtimes[server_name].lock();
            runtime.connection = ConnectionState::Connecting;
        }

        let service = client::connect(descriptor).await;
        let mut runtime = self.runtimes[server_name].lock();
        let result = match service {
            Ok(service) => {
                let tools = service.peer().list_all_tools().await.map_err(|e| {
                    PoolError::Transport {
                        server: server_name.to_string(),
                        message: e.to_string(),
                    }
                })?;
                tracing::info!(server = %server_name, tool_count = tools.len(), "connected to downstream server");
                runtime.session = Some(ConnectedSession::new(service, tools));
                runtime.connection = ConnectionState::Connected;
                runtime.record_success(&self.config);
                Ok(())
            }
            Err(e) => {
                runtime.connection = ConnectionState::Error;
                runtime.record_failure(&self.config, e.to_string());
                Err(e)
            }
        };
        ucp_telemetry::metrics::record_breaker_state(server_name, runtime.breaker);
        result
    }

    /// Drop every live session, closing transports (and killing stdio child
    /// processes) as each `RunningService` is dropped.
    pub fn disconnect_all(&self) {
        for (name, runtime) in &self.runtimes {
            let mut runtime = runtime.lock();
            if runtime.session.take().is_some() {
                tracing::info!(server = %name, "disconnected from downstream server");
            }
            runtime.connection = ConnectionState::Disconnected;
        }
    }

    pub fn list_tools(&self, server_name: &str) -> Result<Vec<rmcp::model::Tool>> {
        let runtime = self
            .runtimes
            .get(server_name)
            .ok_or_else(|| PoolError::UnknownServer(server_name.to_string()))?
            .lock();
        Ok(runtime
            .session
            .as_ref()
            .map(|s| s.tools.clone())
            .unwrap_or_default())
    }

    pub fn list_all_tools(&self) -> Vec<(String, Vec<rmcp::model::Tool>)> {
        self.runtimes
            .keys()
            .filter_map(|name| {
                let tools = self.list_tools(name).ok()?;
                if tools.is_empty() {
                    None
                } else {
                    Some((name.clone(), tools))
                }
            })
            .collect()
    }

    /// Invoke a tool on one downstream server, retrying transient failures
    /// with exponential backoff up to `max_retries`, subject to the per-call
    /// timeout and the server's circuit breaker (§4.3).
    pub async fn call_tool(
        &self,
        server_name: &str,
        tool_name: &str,
        arguments: Value,
    ) -> Result<CallToolResult> {
        self.descriptor(server_name)?;
        let timeout = Duration::from_secs(self.config.call_timeout_secs);
        let mut attempt = 0;

        loop {
            let peer = {
                let mut runtime = self.runtimes[server_name].lock();
                let allowed = runtime.allow_call(&self.config);
                ucp_telemetry::metrics::record_breaker_state(server_name, runtime.breaker);
                if !allowed {
                    return Err(PoolError::BreakerOpen {
                        server: server_name.to_string(),
                        retry_after_secs: runtime.retry_after_secs(&self.config),
                    });
                }
                runtime.note_attempt();
                runtime.session.as_ref().map(|s| s.peer.clone())
            };

            let Some(peer) = peer else {
                self.connect_one(server_name).await?;
                continue;
            };

            let arguments = match arguments.clone() {
                Value::Object(map) => Some(map),
                _ => None,
            };

            let call = peer.call_tool(CallToolRequestParams {
                meta: None,
                name: tool_name.to_string().into(),
                arguments,
                task: None,
            });

            self.runtimes[server_name].lock().in_flight += 1;
            let outcome = tokio::time::timeout(timeout, call).await;
            self.runtimes[server_name].lock().in_flight -= 1;

            match outcome {
                Ok(Ok(result)) => {
                    let mut runtime = self.runtimes[server_name].lock();
                    runtime.record_success(&self.config);
                    ucp_telemetry::metrics::record_breaker_state(server_name, runtime.breaker);
                    return Ok(result);
                }
                Ok(Err(e)) => {
                    let mut runtime = self.runtimes[server_name].lock();
                    runtime.record_failure(&self.config, e.to_string());
                    ucp_telemetry::metrics::record_breaker_state(server_name, runtime.breaker);
                    drop(runtime);
                    if attempt >= self.config.max_retries {
                        return Err(PoolError::Transport {
                            server: server_name.to_string(),
                            message: e.to_string(),
                        });
                    }
                }
                Err(_) => {
                    let mut runtime = self.runtimes[server_name].lock();
                    runtime.record_failure(&self.config, "call timed out".to_string());
                    ucp_telemetry::metrics::record_breaker_state(server_name, runtime.breaker);
                    drop(runtime);
                    if attempt >= self.config.max_retries {
                        return Err(PoolError::Timeout {
                            server: server_name.to_string(),
                            timeout_secs: self.config.call_timeout_secs,
                        });
                    }
                }
            }

            tokio::time::sleep(self.backoff_for(attempt)).await;
            attempt += 1;
        }
    }

    /// Normalized outstanding-load estimate in `[0, 1]`, saturating at
    /// `LOAD_SATURATION_IN_FLIGHT` concurrent calls. Unknown servers report
    /// maximum load so the Router never preferentially routes to them.
    pub fn load(&self, server_name: &str) -> f64 {
        const LOAD_SATURATION_IN_FLIGHT: u32 = 8;
        match self.runtimes.get(server_name) {
            Some(runtime) => {
                let in_flight = runtime.lock().in_flight;
                (in_flight as f64 / LOAD_SATURATION_IN_FLIGHT as f64).min(1.0)
            }
            None => 1.0,
        }
    }

    /// Normalized breaker state in `[0, 1]` (0 closed, 0.5 half-open, 1 open).
    /// Unknown servers report fully open so the Router never prefers them.
    pub fn breaker_value(&self, server_name: &str) -> f64 {
        match self.runtimes.get(server_name) {
            Some(runtime) => runtime.lock().breaker.as_gauge_value() / 2.0,
            None => 1.0,
        }
    }

    pub fn status(&self) -> Vec<ServerStatus> {
        let mut statuses: Vec<ServerStatus> = self
            .runtimes
            .iter()
            .map(|(name, runtime)| {
                let runtime = runtime.lock();
                ServerStatus {
                    name: name.clone(),
                    connection: runtime.connection,
                    breaker: runtime.breaker,
                    tool_count: runtime.session.as_ref().map(|s| s.tools.len()).unwrap_or(0),
                    last_error: runtime.last_error.clone(),
                }
            })
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_core::server::Transport;

    fn descriptor(name: &str) -> ServerDescriptor {
        ServerDescriptor {
            name: name.to_string(),
            transport: Transport::Stdio,
            command: Some("nonexistent-mcp-binary".to_string()),
            args: Vec::new(),
            env: Default::default(),
            url: None,
            auth: None,
            tags: Default::default(),
            description: String::new(),
            timeout_secs: None,
        }
    }

    #[tokio::test]
    async fn unknown_server_errors() {
        let pool = ConnectionPool::new(vec![descriptor("fs")], PoolConfig::default());
        let err = pool
            .call_tool("nope", "read_file", serde_json::json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, PoolError::UnknownServer(_)));
    }

    #[tokio::test]
    async fn status_reports_disconnected_before_connect() {
        let pool = ConnectionPool::new(vec![descriptor("fs")], PoolConfig::default());
        let statuses = pool.status();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].connection, ConnectionState::Disconnected);
        assert_eq!(statuses[0].breaker, BreakerState::Closed);
    }

    #[tokio::test]
    async fn breaker_opens_after_failure_threshold() {
        let config = PoolConfig {
            failure_threshold: 2,
            max_retries: 0,
            base_backoff_secs: 0.0,
            call_timeout_secs: 1,
            ..PoolConfig::default()
        };
        let pool = ConnectionPool::new(vec![descriptor("fs")], config);
        for _ in 0..2 {
            let _ = pool
                .call_tool("fs", "read_file", serde_json::json!({}))
                .await;
        }
        let statuses = pool.status();
        assert_eq!(statuses[0].breaker, BreakerState::Open);
    }
}
