//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guard_requests_denied_total` (counter): denials by kind
//!   (`cors`, `csrf`, `rate_limit`)
//! - `guard_csrf_tokens_issued_total` (counter)
//! - `guard_entries_swept_total` (counter): stale entries removed by the
//!   background sweepers, by component
//!
//! # Design Decisions
//! - Low-overhead updates (atomic counters)
//! - Exposition via the Prometheus exporter, bound from config

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a request denied by the protection pipeline.
pub fn record_denied(kind: &'static str) {
    counter!("guard_requests_denied_total", "kind" => kind).increment(1);
}

/// Record a CSRF token issuance.
pub fn record_csrf_issued() {
    counter!("guard_csrf_tokens_issued_total").increment(1);
}

/// Record entries removed by a background sweep.
pub fn record_swept(component: &'static str, removed: u64) {
    counter!("guard_entries_swept_total", "component" => component).increment(removed);
}
