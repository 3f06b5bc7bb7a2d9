//! Append-only JSONL event log: one writer task owns the file handle, fed
//! over an `mpsc` channel so `tools/list`/`tools/call` handlers never block
//! on disk I/O (§5).

use crate::event::TelemetryEvent;
use chrono::Utc;
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tracing::{error, warn};

/// Handle held by callers; cloning it shares the same writer task.
#[derive(Clone)]
pub struct TelemetryLog {
    sender: mpsc::Sender<TelemetryEvent>,
}

impl TelemetryLog {
    /// Spawn the writer task. `dir` holds one file per UTC day, named
    /// `ucp_telemetry_YYYY-MM-DD.jsonl`.
    pub fn spawn(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let (sender, receiver) = mpsc::channel(4096);
        tokio::spawn(writer_task(dir, receiver));
        Self { sender }
    }

    /// Enqueue an event. Never blocks the caller on I/O; drops the event
    /// with a warning if the channel is full rather than apply backpressure
    /// to the request path.
    pub fn emit(&self, event: impl Into<TelemetryEvent>) {
        if let Err(err) = self.sender.try_send(event.into()) {
            warn!(%err, "telemetry log channel full, dropping event");
        }
    }
}

fn file_path_for(dir: &Path, now: chrono::DateTime<Utc>) -> PathBuf {
    dir.join(format!("ucp_telemetry_{}.jsonl", now.format("%Y-%m-%d")))
}

async fn writer_task(dir: PathBuf, mut receiver: mpsc::Receiver<TelemetryEvent>) {
    if let Err(err) = tokio::fs::create_dir_all(&dir).await {
        error!(%err, path = %dir.display(), "failed to create telemetry directory");
        return;
    }

    let mut current_day = String::new();
    let mut file = None;

    while let Some(event) = receiver.recv().await {
        let now = Utc::now();
        let day = now.format("%Y-%m-%d").to_string();
        if day != current_day || file.is_none() {
            let path = file_path_for(&dir, now);
            match OpenOptions::new().create(true).append(true).open(&path).await {
                Ok(handle) => {
                    file = Some(handle);
                    current_day = day;
                }
                Err(err) => {
                    error!(%err, path = %path.display(), "failed to open telemetry log file");
                    continue;
                }
            }
        }

        let Some(handle) = file.as_mut() else { continue };
        match serde_json::to_string(&event) {
            Ok(mut line) => {
                line.push('\n');
                if let Err(err) = handle.write_all(line.as_bytes()).await {
                    error!(%err, "failed to append telemetry event");
                }
            }
            Err(err) => error!(%err, "failed to serialize telemetry event"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ucp_core::RoutingEvent;
    use uuid::Uuid;

    fn sample_routing_event() -> RoutingEvent {
        RoutingEvent {
            event_type: RoutingEvent::kind(),
            event_id: Uuid::new_v4(),
            session_id: "s1".into(),
            request_id: "r1".into(),
            trace_id: "t1".into(),
            timestamp_ms: 1,
            query: "list files".into(),
            selected: vec!["fs.list_directory".into()],
            scores: Default::default(),
            strategy_used: "sota".into(),
            exploration_triggered: false,
            selection_time_ms: 2,
            candidate_count: 5,
        }
    }

    #[tokio::test]
    async fn emits_event_to_todays_file() {
        let tmp = tempfile::tempdir().unwrap();
        let log = TelemetryLog::spawn(tmp.path());
        log.emit(sample_routing_event());
        tokio::time::sleep(Duration::from_millis(100)).await;

        let expected = file_path_for(tmp.path(), Utc::now());
        let contents = tokio::fs::read_to_string(&expected).await.unwrap();
        assert!(contents.contains("\"session_id\":\"s1\""));
    }
}
