//! Metrics collection and exposition.
//!
//! # Metrics
//! - `sales_api_lifecycle_state` (gauge): supervisor state code
//! - `sales_api_shutdown_outcomes_total` (counter): shutdown results by outcome
//! - `sales_api_connections_total` (counter): accepted connections
//! - `sales_api_open_connections` (gauge): currently open connections

use std::net::SocketAddr;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_lifecycle_state(code: u8) {
    metrics::gauge!("sales_api_lifecycle_state").set(f64::from(code));
}

pub fn record_shutdown_outcome(outcome: &'static str) {
    metrics::counter!("sales_api_shutdown_outcomes_total", "outcome" => outcome).increment(1);
}

pub fn record_connection_opened() {
    metrics::counter!("sales_api_connections_total").increment(1);
    metrics::gauge!("sales_api_open_connections").increment(1.0);
}

pub fn record_connection_closed() {
    metrics::gauge!("sales_api_open_connections").decrement(1.0);
}
