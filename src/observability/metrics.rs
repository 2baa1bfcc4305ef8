//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): forwarded requests by method, status
//! - `relay_request_duration_seconds` (histogram): forward latency
//! - `relay_rejected_total` (counter): invocations rejected before forwarding
//! - `relay_log_flushes_total` (counter): deliveries by outcome
//! - `relay_log_lines_total` (counter): lines handed to the ingestion endpoint

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "relay_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    metrics::histogram!("relay_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_rejected(reason: &'static str) {
    metrics::counter!("relay_rejected_total", "reason" => reason).increment(1);
}

pub fn record_flush(outcome: &'static str, lines: usize) {
    metrics::counter!("relay_log_flushes_total", "outcome" => outcome).increment(1);
    metrics::counter!("relay_log_lines_total").increment(lines as u64);
}
