//! Metrics collection and exposition.
//!
//! # Metrics
//! - `plan_store_requests_total` (counter): requests by method, status
//! - `plan_store_request_duration_seconds` (histogram): request latency
//! - `plan_store_store_writes_total` (counter): durable writes by store, outcome
//! - `plan_store_store_write_duration_seconds` (histogram): queue slot to commit
//! - `plan_store_sessions_total` (counter): session events (issued, expired, revoked, rejected, swept)

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(address = %addr, error = %err, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let status = status.to_string();
    counter!(
        "plan_store_requests_total",
        "method" => method.to_string(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "plan_store_request_duration_seconds",
        "method" => method.to_string(),
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_store_write(store: &str, outcome: &'static str, start: Instant) {
    counter!(
        "plan_store_store_writes_total",
        "store" => store.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("plan_store_store_write_duration_seconds", "store" => store.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_session_event(event: &'static str) {
    counter!("plan_store_sessions_total", "event" => event).increment(1);
}

pub fn record_sessions_swept(count: usize) {
    counter!("plan_store_sessions_total", "event" => "swept").increment(count as u64);
}
