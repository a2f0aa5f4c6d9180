//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): dispatched requests by method, status, service
//! - `gateway_request_duration_seconds` (histogram): dispatch latency
//! - `gateway_breaker_open` (gauge): 1=open, 0=closed, per instance
//! - `gateway_instance_health` (gauge): 1=healthy, 0=unhealthy, per instance

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its HTTP scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a dispatched request.
pub fn record_request(method: &str, status: u16, service: &str, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("service", service.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

/// Record a breaker transition.
pub fn record_breaker_state(service: &str, instance: &str, open: bool) {
    metrics::gauge!(
        "gateway_breaker_open",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .set(if open { 1.0 } else { 0.0 });
}

/// Record an instance health flag.
pub fn record_instance_health(service: &str, instance: &str, healthy: bool) {
    metrics::gauge!(
        "gateway_instance_health",
        "service" => service.to_string(),
        "instance" => instance.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}
