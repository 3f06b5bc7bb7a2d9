//! Wires the Tool Zoo, Router, Connection Pool, Session Manager, and
//! telemetry into one shared handle the MCP server and CLI commands operate
//! against.

use anyhow::{Context as _, Result};
use std::sync::Arc;
use ucp_core::config::GatewayConfig;
use ucp_pool::ConnectionPool;
use ucp_router::{Router, ServerSignals};
use ucp_session::{InMemorySessionStore, SessionStore, SqliteSessionStore};
use ucp_telemetry::{TelemetryIndex, TelemetryLog};
use ucp_zoo::{
    EmbeddingBackend, HashEmbeddingBackend, OpenAiEmbeddingBackend, SqliteVectorStore, ToolZoo,
    VectorStore,
};

/// Bridges the Connection Pool's live per-server state into the Router's
/// `ServerSignals` trait. Lives here, not in `ucp-pool` or `ucp-router`,
/// because it is the only crate depending on both.
pub struct PoolSignals(pub Arc<ConnectionPool>);

impl ServerSignals for PoolSignals {
    fn load(&self, server_name: &str) -> f64 {
        self.0.load(server_name)
    }

    fn breaker_value(&self, server_name: &str) -> f64 {
        self.0.breaker_value(server_name)
    }
}

/// Everything a running gateway (MCP server, HTTP admin surface, or a CLI
/// command) needs, assembled once from a loaded and validated config.
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub zoo: Arc<ToolZoo>,
    pub router: Router,
    pub pool: Arc<ConnectionPool>,
    pub sessions: Arc<dyn SessionStore>,
    pub telemetry_log: TelemetryLog,
    pub telemetry_index: Arc<TelemetryIndex>,
}

impl GatewayContext {
    pub async fn build(config: GatewayConfig) -> Result<Self> {
        if config.tool_zoo.vector_store != "sqlite" {
            anyhow::bail!(
                "unsupported tool_zoo.vector_store '{}': this binary is built with only the \
                 embedded sqlite vector store; the qdrant backend is a library-level option \
                 that needs the ucp-zoo 'qdrant' feature enabled",
                config.tool_zoo.vector_store
            );
        }

        let embeddings: Arc<dyn EmbeddingBackend> = match std::env::var("OPENAI_API_KEY") {
            Ok(key) if !key.is_empty() => {
                tracing::info!("using OpenAI embeddings for tool zoo semantic search");
                Arc::new(OpenAiEmbeddingBackend::new(
                    key,
                    "text-embedding-3-small",
                    config.tool_zoo.embedding_dim,
                ))
            }
            _ => {
                tracing::info!("OPENAI_API_KEY not set, using offline hash embeddings for tool zoo");
                Arc::new(HashEmbeddingBackend::new(config.tool_zoo.embedding_dim))
            }
        };

        let vectors: Arc<dyn VectorStore> = Arc::new(
            SqliteVectorStore::connect(&config.tool_zoo.db_path)
                .await
                .context("opening tool zoo vector store")?,
        );

        let zoo = Arc::new(ToolZoo::new(embeddings, vectors, config.tool_zoo.clone()));
        let router = Router::new(
            zoo.clone(),
            config.router.clone(),
            config.bandit.clone(),
            config.bias_learning.clone(),
        );

        let pool = Arc::new(ConnectionPool::new(
            config.downstream_servers.clone(),
            config.pool.clone(),
        ));

        let sessions: Arc<dyn SessionStore> = match config.session.store.as_str() {
            "memory" => Arc::new(InMemorySessionStore::new()),
            _ => Arc::new(
                SqliteSessionStore::connect(&config.session.db_path)
                    .await
                    .context("opening session store")?,
            ),
        };

        let telemetry_log = TelemetryLog::spawn(config.telemetry.directory.clone());
        let telemetry_index = Arc::new(TelemetryIndex::new());

        Ok(Self {
            config,
            zoo,
            router,
            pool,
            sessions,
            telemetry_log,
            telemetry_index,
        })
    }

    pub fn signals(&self) -> PoolSignals {
        PoolSignals(self.pool.clone())
    }
}
