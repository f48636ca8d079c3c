//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, response kind
//! - `proxy_request_duration_seconds` (histogram): latency distribution
//! - `proxy_upstream_hops` (histogram): responses per fetch, redirects included

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint and install the global recorder.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one completed client request.
pub fn record_request(method: &str, status: u16, kind: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();

    metrics::counter!(
        "proxy_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "kind" => kind
    )
    .increment(1);
    metrics::histogram!(
        "proxy_request_duration_seconds",
        "method" => method,
        "status" => status,
        "kind" => kind
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record how many responses one upstream fetch took.
pub fn record_upstream_hops(hops: usize) {
    metrics::histogram!("proxy_upstream_hops").record(hops as f64);
}
