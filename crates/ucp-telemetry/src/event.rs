use serde::{Deserialize, Serialize};
use ucp_core::{RewardSignal, RoutingEvent, ToolCallEvent};

/// Sum of every event kind the log accepts. Each inner struct already
/// carries its own `event_type` discriminant field, so the enum itself
/// stays untagged and a reader distinguishes variants by that field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TelemetryEvent {
    Routing(RoutingEvent),
    ToolCall(ToolCallEvent),
    Reward(RewardSignal),
}

impl TelemetryEvent {
    pub fn session_id(&self) -> &str {
        match self {
            TelemetryEvent::Routing(e) => &e.session_id,
            TelemetryEvent::ToolCall(e) => &e.session_id,
            TelemetryEvent::Reward(e) => &e.session_id,
        }
    }

    pub fn timestamp_ms(&self) -> i64 {
        match self {
            TelemetryEvent::Routing(e) => e.timestamp_ms,
            TelemetryEvent::ToolCall(e) => e.timestamp_ms,
            TelemetryEvent::Reward(e) => e.timestamp_ms,
        }
    }
}

impl From<RoutingEvent> for TelemetryEvent {
    fn from(event: RoutingEvent) -> Self {
        TelemetryEvent::Routing(event)
    }
}

impl From<ToolCallEvent> for TelemetryEvent {
    fn from(event: ToolCallEvent) -> Self {
        TelemetryEvent::ToolCall(event)
    }
}

impl From<RewardSignal> for TelemetryEvent {
    fn from(event: RewardSignal) -> Self {
        TelemetryEvent::Reward(event)
    }
}
