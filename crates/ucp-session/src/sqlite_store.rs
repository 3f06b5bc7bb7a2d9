//! Embedded SQLite session store (§4.4, §9 Open Question: default backend).
//!
//! Messages and recent-tool entries are stored as JSON blobs keyed by
//! session id rather than normalized rows, since the access pattern is
//! always "load the whole session, mutate in memory, write it back" — there
//! is no query that needs row-level access to a single message.

use crate::error::{Result, SessionError};
use crate::store::SessionStore;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use ucp_core::session::{Role, SessionState, DEFAULT_RECENT_TOOLS_CAPACITY};

pub struct SqliteSessionStore {
    pool: SqlitePool,
    recent_tools_capacity: usize,
}

impl SqliteSessionStore {
    pub async fn connect(path: &str) -> Result<Self> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite://{path}?mode=rwc")
        };
        let pool = SqlitePool::connect(&url)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS sessions (
                session_id TEXT PRIMARY KEY,
                state_json TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(Self {
            pool,
            recent_tools_capacity: DEFAULT_RECENT_TOOLS_CAPACITY,
        })
    }

    async fn load_state(&self, session_id: &str) -> Result<SessionState> {
        let row = sqlx::query("SELECT state_json FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;
        let row = row.ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        let json: String = row.get("state_json");
        serde_json::from_str(&json).map_err(|e| SessionError::Store(e.to_string()))
    }

    async fn save_state(&self, state: &SessionState) -> Result<()> {
        let json = serde_json::to_string(state).map_err(|e| SessionError::Store(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO sessions (session_id, state_json)
            VALUES (?, ?)
            ON CONFLICT(session_id) DO UPDATE SET state_json = excluded.state_json
            "#,
        )
        .bind(&state.session_id)
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn create_session(&self) -> Result<String> {
        let session_id = uuid::Uuid::new_v4().to_string();
        let state = SessionState::new(session_id.clone());
        self.save_state(&state).await?;
        Ok(session_id)
    }

    async fn get(&self, session_id: &str) -> Result<SessionState> {
        self.load_state(session_id).await
    }

    async fn append_message(&self, session_id: &str, role: Role, content: &str) -> Result<()> {
        let mut state = self.load_state(session_id).await?;
        state.append_message(role, content);
        self.save_state(&state).await
    }

    async fn set_trace_context(&self, session_id: &str, trace_id: &str, request_id: &str) -> Result<()> {
        let mut state = self.load_state(session_id).await?;
        state.set_trace_context(trace_id, request_id);
        self.save_state(&state).await
    }

    async fn log_tool_usage(&self, session_id: &str, tool_name: &str, success: bool) -> Result<()> {
        let mut state = self.load_state(session_id).await?;
        state.log_tool_usage(tool_name, success, self.recent_tools_capacity);
        self.save_state(&state).await
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| SessionError::Store(e.to_string()))?;
        Ok(())
    }

    /// SQLite writes are already durable per-call; nothing to flush.
    async fn persist(&self) -> Result<()> {
        Ok(())
    }

    /// SQLite reads through on every call; nothing to warm.
    async fn load(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> SqliteSessionStore {
        SqliteSessionStore::connect(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn create_then_get_round_trips() {
        let store = store().await;
        let id = store.create_session().await.unwrap();
        let state = store.get(&id).await.unwrap();
        assert_eq!(state.session_id, id);
        assert!(state.messages.is_empty());
    }

    #[tokio::test]
    async fn append_message_persists_across_reads() {
        let store = store().await;
        let id = store.create_session().await.unwrap();
        store.append_message(&id, Role::User, "hello").await.unwrap();
        let state = store.get(&id).await.unwrap();
        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.latest_user_message(), Some("hello"));
    }

    #[tokio::test]
    async fn log_tool_usage_updates_recent_tools() {
        let store = store().await;
        let id = store.create_session().await.unwrap();
        store.log_tool_usage(&id, "fs.read_file", true).await.unwrap();
        let state = store.get(&id).await.unwrap();
        assert_eq!(state.recent_tools.back().unwrap().name, "fs.read_file");
        assert!(state.recent_tools.back().unwrap().success);
    }

    #[tokio::test]
    async fn delete_removes_session() {
        let store = store().await;
        let id = store.create_session().await.unwrap();
        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.is_err());
    }

    #[tokio::test]
    async fn get_missing_session_errors() {
        let store = store().await;
        assert!(matches!(
            store.get("nope").await,
            Err(SessionError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn set_trace_context_round_trips() {
        let store = store().await;
        let id = store.create_session().await.unwrap();
        store.set_trace_context(&id, "trace-1", "req-1").await.unwrap();
        let state = store.get(&id).await.unwrap();
        assert_eq!(state.trace_id.as_deref(), Some("trace-1"));
        assert_eq!(state.request_id.as_deref(), Some("req-1"));
    }
}
