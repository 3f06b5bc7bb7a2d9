use crate::error::Result;
use async_trait::async_trait;
use ucp_core::session::{Role, SessionState};

/// Owns per-client conversation state (§4.4). Every mutation goes through the
/// store so `updated_at`/`recent_tools` decay stay consistent regardless of
/// which backend holds the data.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(&self) -> Result<String>;
    async fn get(&self, session_id: &str) -> Result<SessionState>;
    async fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<()>;
    async fn set_trace_context(&self, session_id: &str, trace_id: &str, request_id: &str) -> Result<()>;
    async fn log_tool_usage(&self, session_id: &str, tool_name: &str, success: bool) -> Result<()>;
    async fn delete(&self, session_id: &str) -> Result<()>;

    /// Flush in-memory state to durable storage. A no-op for backends that
    /// are already durable on every write (e.g. SQLite).
    async fn persist(&self) -> Result<()>;
    /// Load durable state back into memory. A no-op for backends that read
    /// through on every call.
    async fn load(&self) -> Result<()>;
}
