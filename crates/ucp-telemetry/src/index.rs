//! In-memory index over recent events, used by the `status` CLI/HTTP surface
//! to answer "what did this session route/call recently" without re-reading
//! the JSONL log from disk.

use crate::event::TelemetryEvent;
use parking_lot::RwLock;
use std::collections::{HashMap, VecDeque};

/// Cap on events retained per session; oldest entries are evicted first.
const DEFAULT_CAPACITY_PER_SESSION: usize = 200;

#[derive(Default)]
pub struct TelemetryIndex {
    by_session: RwLock<HashMap<String, VecDeque<TelemetryEvent>>>,
    capacity_per_session: usize,
}

impl TelemetryIndex {
    pub fn new() -> Self {
        Self {
            by_session: RwLock::new(HashMap::new()),
            capacity_per_session: DEFAULT_CAPACITY_PER_SESSION,
        }
    }

    pub fn record(&self, event: TelemetryEvent) {
        let mut by_session = self.by_session.write();
        let entries = by_session.entry(event.session_id().to_string()).or_default();
        entries.push_back(event);
        while entries.len() > self.capacity_per_session.max(1) {
            entries.pop_front();
        }
    }

    /// Most recent events for a session, oldest first.
    pub fn for_session(&self, session_id: &str) -> Vec<TelemetryEvent> {
        self.by_session
            .read()
            .get(session_id)
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn session_count(&self) -> usize {
        self.by_session.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_core::RoutingEvent;
    use uuid::Uuid;

    fn event(session_id: &str) -> TelemetryEvent {
        TelemetryEvent::Routing(RoutingEvent {
            event_type: RoutingEvent::kind(),
            event_id: Uuid::new_v4(),
            session_id: session_id.to_string(),
            request_id: "r".into(),
            trace_id: "t".into(),
            timestamp_ms: 0,
            query: "q".into(),
            selected: vec![],
            scores: Default::default(),
            strategy_used: "sota".into(),
            exploration_triggered: false,
            selection_time_ms: 0,
            candidate_count: 0,
        })
    }

    #[test]
    fn records_and_retrieves_by_session() {
        let index = TelemetryIndex::new();
        index.record(event("s1"));
        index.record(event("s2"));
        assert_eq!(index.for_session("s1").len(), 1);
        assert_eq!(index.session_count(), 2);
    }

    #[test]
    fn evicts_oldest_beyond_capacity() {
        let index = TelemetryIndex {
            by_session: RwLock::new(HashMap::new()),
            capacity_per_session: 2,
        };
        for _ in 0..5 {
            index.record(event("s1"));
        }
        assert_eq!(index.for_session("s1").len(), 2);
    }
}
