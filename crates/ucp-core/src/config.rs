//! YAML configuration schema (§6, §10.3).
//!
//! Mirrors the top-level keys named in the spec: `server`, `tool_zoo`,
//! `router`, `session`, `telemetry`, `bandit`, `bias_learning`,
//! `downstream_servers`. Every numeric knob carries the default named in the
//! spec so an operator only needs to set what differs from it.

use crate::server::ServerDescriptor;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub tool_zoo: ToolZooConfig,
    #[serde(default)]
    pub router: RouterConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    #[serde(default)]
    pub bandit: BanditConfig,
    #[serde(default)]
    pub bias_learning: BiasLearningConfig,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub downstream_servers: Vec<ServerDescriptor>,
}

/// Connection pool tuning (§4.3/§5): retry, backoff, timeouts, breaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_base_backoff_secs")]
    pub base_backoff_secs: f64,
    #[serde(default = "default_call_timeout_secs")]
    pub call_timeout_secs: u64,
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
    #[serde(default = "default_half_open_max_calls")]
    pub half_open_max_calls: u32,
}

fn default_max_retries() -> u32 {
    3
}
fn default_base_backoff_secs() -> f64 {
    1.0
}
fn default_call_timeout_secs() -> u64 {
    30
}
fn default_failure_threshold() -> u32 {
    5
}
fn default_open_timeout_secs() -> u64 {
    60
}
fn default_half_open_max_calls() -> u32 {
    3
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_backoff_secs: default_base_backoff_secs(),
            call_timeout_secs: default_call_timeout_secs(),
            failure_threshold: default_failure_threshold(),
            open_timeout_secs: default_open_timeout_secs(),
            half_open_max_calls: default_half_open_max_calls(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Stdio,
    Http,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_transport_mode")]
    pub transport: TransportMode,
    #[serde(default = "default_http_bind")]
    pub http_bind: String,
    #[serde(default = "default_request_deadline_secs")]
    pub request_deadline_secs: u64,
}

fn default_transport_mode() -> TransportMode {
    TransportMode::Stdio
}
fn default_http_bind() -> String {
    "127.0.0.1:8642".to_string()
}
fn default_request_deadline_secs() -> u64 {
    60
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: default_transport_mode(),
            http_bind: default_http_bind(),
            request_deadline_secs: default_request_deadline_secs(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Semantic,
    Keyword,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolZooConfig {
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    #[serde(default = "default_min_similarity")]
    pub min_similarity: f64,
    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
    /// `store = "sqlite"` (default, embedded) or `"qdrant"` (pluggable, needs `qdrant_url`).
    #[serde(default = "default_vector_store")]
    pub vector_store: String,
    #[serde(default)]
    pub qdrant_url: Option<String>,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_semantic_weight() -> f64 {
    0.6
}
fn default_keyword_weight() -> f64 {
    0.4
}
fn default_min_similarity() -> f64 {
    0.05
}
fn default_embedding_dim() -> usize {
    384
}
fn default_vector_store() -> String {
    "sqlite".to_string()
}
fn default_db_path() -> String {
    "ucp-zoo.db".to_string()
}

impl Default for ToolZooConfig {
    fn default() -> Self {
        Self {
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            min_similarity: default_min_similarity(),
            embedding_dim: default_embedding_dim(),
            vector_store: default_vector_store(),
            qdrant_url: None,
            db_path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterStrategy {
    Baseline,
    Sota,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplorationType {
    Epsilon,
    Thompson,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouterConfig {
    #[serde(default = "default_strategy")]
    pub strategy: RouterStrategy,
    #[serde(default = "default_candidate_pool_size")]
    pub candidate_pool_size: usize,
    #[serde(default = "default_max_tools")]
    pub max_tools: usize,
    #[serde(default = "default_min_tools")]
    pub min_tools: usize,
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,
    /// Per-server cap on slate contribution. Configuration value, not a
    /// hard-coded constant — see the open question in SPEC_FULL.md §9.
    #[serde(default = "default_max_per_server")]
    pub max_per_server: usize,
    #[serde(default = "default_exploration_rate")]
    pub exploration_rate: f64,
    #[serde(default = "default_exploration_type")]
    pub exploration_type: ExplorationType,
    #[serde(default = "default_cross_encoder_enabled")]
    pub cross_encoder_enabled: bool,
    #[serde(default = "default_rerank_cache_ttl_secs")]
    pub rerank_cache_ttl_secs: u64,
    /// Tools to offer when both semantic/hybrid and keyword candidate
    /// retrieval fail; the final fallback after this is "all indexed tools".
    #[serde(default)]
    pub fallback_tools: Vec<String>,
}

fn default_strategy() -> RouterStrategy {
    RouterStrategy::Sota
}
fn default_candidate_pool_size() -> usize {
    50
}
fn default_max_tools() -> usize {
    8
}
fn default_min_tools() -> usize {
    1
}
fn default_max_context_tokens() -> u32 {
    4000
}
fn default_max_per_server() -> usize {
    3
}
fn default_exploration_rate() -> f64 {
    0.05
}
fn default_exploration_type() -> ExplorationType {
    ExplorationType::Epsilon
}
fn default_cross_encoder_enabled() -> bool {
    false
}
fn default_rerank_cache_ttl_secs() -> u64 {
    300
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            candidate_pool_size: default_candidate_pool_size(),
            max_tools: default_max_tools(),
            min_tools: default_min_tools(),
            max_context_tokens: default_max_context_tokens(),
            max_per_server: default_max_per_server(),
            exploration_rate: default_exploration_rate(),
            exploration_type: default_exploration_type(),
            cross_encoder_enabled: default_cross_encoder_enabled(),
            rerank_cache_ttl_secs: default_rerank_cache_ttl_secs(),
            fallback_tools: Vec::new(),
        }
    }
}

impl RouterConfig {
    /// Effective candidate pool size: never smaller than `4·max_tools` (§4.2).
    pub fn effective_candidate_pool_size(&self) -> usize {
        self.candidate_pool_size.max(4 * self.max_tools)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_recent_tools_capacity")]
    pub recent_tools_capacity: usize,
    /// `store = "sqlite"` (default, embedded) or `"memory"`.
    #[serde(default = "default_session_store")]
    pub store: String,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

fn default_recent_tools_capacity() -> usize {
    10
}
fn default_session_store() -> String {
    "sqlite".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recent_tools_capacity: default_recent_tools_capacity(),
            store: default_session_store(),
            db_path: "ucp-sessions.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_dir")]
    pub directory: String,
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
}

fn default_telemetry_dir() -> String {
    "telemetry".to_string()
}
fn default_retention_days() -> u32 {
    7
}
fn default_metrics_enabled() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            directory: default_telemetry_dir(),
            retention_days: default_retention_days(),
            metrics_enabled: default_metrics_enabled(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BanditConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_l2")]
    pub l2: f64,
}

fn default_learning_rate() -> f64 {
    0.05
}
fn default_l2() -> f64 {
    0.001
}

impl Default for BanditConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            l2: default_l2(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasLearningConfig {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_bias_decay")]
    pub decay: f64,
    #[serde(default = "default_max_bias")]
    pub max_bias: f64,
    #[serde(default = "default_latency_scale")]
    pub latency_scale: f64,
    #[serde(default = "default_latency_cap")]
    pub latency_cap: f64,
    #[serde(default = "default_ctx_scale")]
    pub ctx_scale: f64,
    #[serde(default = "default_ctx_cap")]
    pub ctx_cap: f64,
}

fn default_bias_decay() -> f64 {
    0.01
}
fn default_max_bias() -> f64 {
    0.5
}
fn default_latency_scale() -> f64 {
    1000.0
}
fn default_latency_cap() -> f64 {
    0.3
}
fn default_ctx_scale() -> f64 {
    2000.0
}
fn default_ctx_cap() -> f64 {
    0.2
}

impl Default for BiasLearningConfig {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            decay: default_bias_decay(),
            max_bias: default_max_bias(),
            latency_scale: default_latency_scale(),
            latency_cap: default_latency_cap(),
            ctx_scale: default_ctx_scale(),
            ctx_cap: default_ctx_cap(),
        }
    }
}

impl GatewayConfig {
    /// Load and validate a YAML config file. Any I/O or parse error carries
    /// the file path in its context, per §10.3.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: GatewayConfig = serde_yaml::from_slice(&bytes)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Configuration-invalid errors are fatal per §7: unique server names,
    /// transport-specific fields present, sane numeric ranges.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::BTreeSet::new();
        for server in &self.downstream_servers {
            if !seen.insert(&server.name) {
                anyhow::bail!("duplicate downstream server name: {}", server.name);
            }
            match server.transport {
                crate::server::Transport::Stdio => {
                    if server.command.is_none() {
                        anyhow::bail!(
                            "downstream server '{}' uses stdio transport but has no command",
                            server.name
                        );
                    }
                }
                crate::server::Transport::Http => {
                    if server.url.is_none() {
                        anyhow::bail!(
                            "downstream server '{}' uses http transport but has no url",
                            server.name
                        );
                    }
                }
            }
        }
        if self.router.min_tools > self.router.max_tools {
            anyhow::bail!(
                "router.min_tools ({}) must be <= router.max_tools ({})",
                self.router.min_tools,
                self.router.max_tools
            );
        }
        if self.router.max_per_server == 0 {
            anyhow::bail!("router.max_per_server must be >= 1");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let config = GatewayConfig {
            server: ServerConfig::default(),
            tool_zoo: ToolZooConfig::default(),
            router: RouterConfig::default(),
            session: SessionConfig::default(),
            telemetry: TelemetryConfig::default(),
            bandit: BanditConfig::default(),
            bias_learning: BiasLearningConfig::default(),
            pool: PoolConfig::default(),
            downstream_servers: Vec::new(),
        };
        assert_eq!(config.router.max_per_server, 3);
        assert_eq!(config.router.candidate_pool_size, 50);
        assert_eq!(config.telemetry.retention_days, 7);
    }

    #[test]
    fn validate_rejects_duplicate_server_names() {
        let mut config = GatewayConfig {
            server: ServerConfig::default(),
            tool_zoo: ToolZooConfig::default(),
            router: RouterConfig::default(),
            session: SessionConfig::default(),
            telemetry: TelemetryConfig::default(),
            bandit: BanditConfig::default(),
            bias_learning: BiasLearningConfig::default(),
            pool: PoolConfig::default(),
            downstream_servers: Vec::new(),
        };
        let dup = ServerDescriptor {
            name: "fs".into(),
            transport: crate::server::Transport::Stdio,
            command: Some("fs-server".into()),
            args: Vec::new(),
            env: Default::default(),
            url: None,
            auth: None,
            tags: Default::default(),
            description: String::new(),
            timeout_secs: None,
        };
        config.downstream_servers.push(dup.clone());
        config.downstream_servers.push(dup);
        assert!(config.validate().is_err());
    }

    #[test]
    fn effective_candidate_pool_size_never_below_four_times_max_tools() {
        let mut router = RouterConfig {
            candidate_pool_size: 10,
            max_tools: 8,
            ..RouterConfig::default()
        };
        assert_eq!(router.effective_candidate_pool_size(), 32);
        router.candidate_pool_size = 100;
        assert_eq!(router.effective_candidate_pool_size(), 100);
    }
}
