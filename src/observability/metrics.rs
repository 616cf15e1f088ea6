//! Metrics collection and exposition.
//!
//! # Metrics
//! - `listd_connections_accepted_total` (counter)
//! - `listd_active_connections` (gauge)
//! - `listd_accept_errors_total` (counter): by `kind`
//! - `listd_resource_close_total` (counter): by `resource`, `result`
//! - `listd_resource_close_duration_seconds` (histogram)
//! - `listd_lifecycle_exits_total` (counter): by `exit`
//!
//! Without an installed recorder every call is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from inside the Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_connection_accepted() {
    counter!("listd_connections_accepted_total").increment(1);
}

pub fn record_active_connections(count: u64) {
    gauge!("listd_active_connections").set(count as f64);
}

pub fn record_accept_error(kind: &'static str) {
    counter!("listd_accept_errors_total", "kind" => kind).increment(1);
}

pub fn record_resource_close(resource: &str, success: bool, started: Instant) {
    let result = if success { "ok" } else { "error" };
    counter!(
        "listd_resource_close_total",
        "resource" => resource.to_string(),
        "result" => result
    )
    .increment(1);
    histogram!("listd_resource_close_duration_seconds", "resource" => resource.to_string())
        .record(started.elapsed().as_secs_f64());
}

pub fn record_lifecycle_exit(exit: &'static str) {
    counter!("listd_lifecycle_exits_total", "exit" => exit).increment(1);
}
