//! Prometheus metrics exposition (§6): the four series the gateway promises
//! operators, installed once at process start and rendered at `/metrics`.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use tracing::info;
use ucp_core::BreakerState;

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Histogram bucket boundaries (ms) for `ucp_router_latency_ms`, per §6.
const ROUTER_LATENCY_BUCKETS: &[f64] = &[
    5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0, 2500.0, 5000.0, 10000.0,
];

pub fn install() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(
            metrics_exporter_prometheus::Matcher::Full("ucp_router_latency_ms".to_string()),
            ROUTER_LATENCY_BUCKETS,
        )
        .expect("static bucket list is non-empty")
        .install_recorder()
        .expect("failed to install prometheus recorder");

    PROMETHEUS_HANDLE
        .set(handle.clone())
        .expect("prometheus handle already initialized");
    info!("prometheus metrics installed");
    handle
}

pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

pub fn record_router_latency(selection_time_ms: u64) {
    histogram!("ucp_router_latency_ms").record(selection_time_ms as f64);
}

pub fn record_tool_invocation(tool_name: &str, success: bool) {
    counter!(
        "ucp_tool_invocations_total",
        "tool_name" => tool_name.to_string(),
        "success" => success.to_string(),
    )
    .increment(1);
}

pub fn record_context_shift_detected() {
    counter!("ucp_context_shift_detected_total").increment(1);
}

pub fn record_breaker_state(server_name: &str, state: BreakerState) {
    gauge!("ucp_breaker_state", "server_name" => server_name.to_string()).set(state.as_gauge_value());
}
