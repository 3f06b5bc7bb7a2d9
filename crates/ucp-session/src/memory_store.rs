//! In-memory session store: no persistence, used in tests and by operators
//! who explicitly opt out of durable session state (§9 Open Question).

use crate::error::{Result, SessionError};
use crate::store::SessionStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use ucp_core::session::{Role, SessionState, DEFAULT_RECENT_TOOLS_CAPACITY};

#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionState>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create_session(&self) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let state = SessionState::new(session_id.clone());
        self.sessions.write().insert(session_id.clone(), state);
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<SessionState> {
        self.sessions
            .read()
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }

    async fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        state.append_message(role, content);
        Ok(())
    }

    async fn set_trace_context(&self, session_id: &str, trace_id: &str, request_id: &str) -> Result<()> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        state.set_trace_context(trace_id, request_id);
        Ok(())
    }

    async fn log_tool_usage(&self, session_id: &str, tool_name: &str, success: bool) -> Result<()> {
        let mut sessions = self.sessions.write();
        let state = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        state.log_tool_usage(tool_name, success, DEFAULT_RECENT_TOOLS_CAPACITY);
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.write().remove(session_id);
        Ok(())
    }

    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    async fn load(&self) -> Result<()> {
        Ok(())
    }
}
