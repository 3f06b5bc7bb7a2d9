use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use ucp_core::ToolSchema;

/// Immutable point-in-time view of the index. Readers clone the enclosing
/// `Arc` and operate on it lock-free; writers build a whole new snapshot and
/// swap it in (§5 "Tool Zoo" shared-resource policy).
#[derive(Debug, Clone, Default)]
pub struct ZooSnapshot {
    pub tools: BTreeMap<String, ToolSchema>,
    pub last_index_time: Option<DateTime<Utc>>,
}

impl ZooSnapshot {
    pub fn per_server_count(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for schema in self.tools.values() {
            *counts.entry(schema.server_name.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Build a copy with one server's tools replaced, leaving every other
    /// server's entries untouched — used for per-server re-index.
    pub fn with_server_replaced(&self, server_name: &str, tools: Vec<ToolSchema>) -> Self {
        let mut next = self.tools.clone();
        next.retain(|_, schema| schema.server_name != server_name);
        for schema in tools {
            next.insert(schema.name.clone(), schema);
        }
        Self {
            tools: next,
            last_index_time: Some(Utc::now()),
        }
    }

    pub fn with_full_replace(tools: Vec<ToolSchema>) -> Self {
        let tools = tools.into_iter().map(|t| (t.name.clone(), t)).collect();
        Self {
            tools,
            last_index_time: Some(Utc::now()),
        }
    }
}
