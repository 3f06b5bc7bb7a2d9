use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Immutable record emitted for every `tools/list` decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingEvent {
    pub event_type: &'static str,
    pub event_id: Uuid,
    pub session_id: String,
    pub request_id: String,
    pub trace_id: String,
    pub timestamp_ms: i64,
    pub query: String,
    pub selected: Vec<String>,
    pub scores: BTreeMap<String, f64>,
    pub strategy_used: String,
    pub exploration_triggered: bool,
    pub selection_time_ms: u64,
    pub candidate_count: usize,
}

impl RoutingEvent {
    pub fn kind() -> &'static str {
        "routing"
    }
}

/// Immutable record emitted for every accepted `tools/call`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallEvent {
    pub event_type: &'static str,
    pub event_id: Uuid,
    pub routing_event_id: Uuid,
    pub session_id: String,
    pub request_id: String,
    pub trace_id: String,
    pub timestamp_ms: i64,
    pub tool_name: String,
    pub server_name: String,
    pub success: bool,
    pub exec_ms: u64,
    pub error_code: Option<String>,
}

impl ToolCallEvent {
    pub fn kind() -> &'static str {
        "tool_call"
    }
}

/// Bounded reward scalar derived from a ToolCallEvent, consumed by the
/// Router's online learning step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardSignal {
    pub event_type: &'static str,
    pub event_id: Uuid,
    pub tool_call_event_id: Uuid,
    pub session_id: String,
    pub request_id: String,
    pub trace_id: String,
    pub timestamp_ms: i64,
    pub tool_name: String,
    pub reward: f64,
}

impl RewardSignal {
    pub fn kind() -> &'static str {
        "reward"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_event_round_trips_through_json() {
        let event = RoutingEvent {
            event_type: RoutingEvent::kind(),
            event_id: Uuid::new_v4(),
            session_id: "s1".into(),
            request_id: "r1".into(),
            trace_id: "t1".into(),
            timestamp_ms: 1,
            query: "list my files".into(),
            selected: vec!["fs.list_directory".into()],
            scores: BTreeMap::from([("fs.list_directory".to_string(), 0.9)]),
            strategy_used: "sota".into(),
            exploration_triggered: false,
            selection_time_ms: 4,
            candidate_count: 12,
        };
        let line = serde_json::to_string(&event).unwrap();
        let parsed: RoutingEvent = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed.event_id, event.event_id);
        assert_eq!(parsed.selected, event.selected);
    }
}
