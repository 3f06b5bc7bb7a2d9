use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// One recently-invoked tool, kept with a decay weight for router features.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentTool {
    pub name: String,
    pub invoked_at: DateTime<Utc>,
    /// Geometric decay applied each time a newer tool is appended; `1.0` for
    /// the most recent invocation.
    pub weight: f64,
    pub success: bool,
}

/// Per-client conversation state, owned exclusively by the Session Manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub recent_tools: VecDeque<RecentTool>,
    pub tool_usage: std::collections::BTreeMap<String, u64>,
    pub trace_id: Option<String>,
    pub request_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Default cap on `recent_tools` length, matching §4.4.
pub const DEFAULT_RECENT_TOOLS_CAPACITY: usize = 10;
/// Geometric decay applied to older entries each time a new tool is appended.
pub const RECENT_TOOL_DECAY: f64 = 0.85;

impl SessionState {
    pub fn new(session_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            recent_tools: VecDeque::new(),
            tool_usage: std::collections::BTreeMap::new(),
            trace_id: None,
            request_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append_message(&mut self, role: Role, content: impl Into<String>) {
        self.messages.push(Message {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        });
        self.updated_at = Utc::now();
    }

    /// Latest user message text, used as the implicit `tools/list` query
    /// when the client does not pass an explicit `context` parameter.
    pub fn latest_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Record a tool invocation, applying geometric decay to existing entries
    /// and evicting the oldest once the capacity is exceeded.
    pub fn log_tool_usage(&mut self, tool_name: impl Into<String>, success: bool, capacity: usize) {
        let tool_name = tool_name.into();
        *self.tool_usage.entry(tool_name.clone()).or_insert(0) += 1;

        for entry in &mut self.recent_tools {
            entry.weight *= RECENT_TOOL_DECAY;
        }
        self.recent_tools.push_back(RecentTool {
            name: tool_name,
            invoked_at: Utc::now(),
            weight: 1.0,
            success,
        });
        while self.recent_tools.len() > capacity.max(1) {
            self.recent_tools.pop_front();
        }
        self.updated_at = Utc::now();
    }

    pub fn set_trace_context(&mut self, trace_id: impl Into<String>, request_id: impl Into<String>) {
        self.trace_id = Some(trace_id.into());
        self.request_id = Some(request_id.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recent_tools_evicts_oldest_beyond_capacity() {
        let mut session = SessionState::new("s1");
        for i in 0..15 {
            session.log_tool_usage(format!("tool{i}"), true, DEFAULT_RECENT_TOOLS_CAPACITY);
        }
        assert_eq!(session.recent_tools.len(), DEFAULT_RECENT_TOOLS_CAPACITY);
        assert_eq!(session.recent_tools.back().unwrap().name, "tool14");
    }

    #[test]
    fn decay_shrinks_older_entries() {
        let mut session = SessionState::new("s1");
        session.log_tool_usage("a", true, DEFAULT_RECENT_TOOLS_CAPACITY);
        session.log_tool_usage("b", true, DEFAULT_RECENT_TOOLS_CAPACITY);
        let a = session.recent_tools.front().unwrap();
        assert!(a.weight < 1.0);
    }

    #[test]
    fn latest_user_message_skips_assistant_turns() {
        let mut session = SessionState::new("s1");
        session.append_message(Role::User, "hello");
        session.append_message(Role::Assistant, "hi there");
        assert_eq!(session.latest_user_message(), Some("hello"));
    }
}
