//! Metrics collection and exposition.
//!
//! # Metrics
//! - `prefix_source_refresh_total` (counter): refresh passes by outcome
//! - `prefix_source_refresh_duration_seconds` (histogram): pass latency
//! - `prefix_source_prefixes` (gauge): size of the published snapshot
//! - `prefix_source_malformed_entries_total` (counter): skipped entries

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Count a finished (or skipped) refresh pass.
pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("prefix_source_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_refresh_duration(start: Instant) {
    metrics::histogram!("prefix_source_refresh_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_prefix_count(count: usize) {
    metrics::gauge!("prefix_source_prefixes").set(count as f64);
}

pub fn record_malformed_entries(count: usize) {
    if count > 0 {
        metrics::counter!("prefix_source_malformed_entries_total").increment(count as u64);
    }
}
