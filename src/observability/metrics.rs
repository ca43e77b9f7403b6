//! Metrics collection and exposition.
//!
//! # Metrics
//! - `quic_transport_sessions_total` (counter): sessions accepted
//! - `quic_transport_sessions_rejected_total` (counter): handshakes failed, by reason
//! - `quic_transport_active_sessions` (gauge): sessions being handled
//! - `quic_transport_streams_total` (counter): streams relayed, by kind
//! - `quic_transport_relayed_bytes_total` (counter): bytes relayed, by kind
//!
//! # Design Decisions
//! - Recording is a no-op until a recorder is installed
//! - The Prometheus endpoint is optional and bound on its own address

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_session_accepted() {
    metrics::counter!("quic_transport_sessions_total").increment(1);
}

/// `reason` is one of `accept`, `decode`, `bad_origin`, `bad_path`.
pub fn record_session_rejected(reason: &'static str) {
    metrics::counter!("quic_transport_sessions_rejected_total", "reason" => reason).increment(1);
}

pub fn record_active_sessions(count: u64) {
    metrics::gauge!("quic_transport_active_sessions").set(count as f64);
}

/// `kind` is `bidi` or `uni`.
pub fn record_stream_relayed(kind: &'static str, bytes: u64) {
    metrics::counter!("quic_transport_streams_total", "kind" => kind).increment(1);
    metrics::counter!("quic_transport_relayed_bytes_total", "kind" => kind).increment(bytes);
}
