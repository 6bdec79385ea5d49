//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gate_decisions_total` (counter): decisions by `stage`, `outcome`
//! - `gate_request_duration_seconds` (histogram): gate evaluation latency
//! - `gate_upstream_requests_total` (counter): forwarded requests by `status`
//! - `gate_upstream_duration_seconds` (histogram): forwarding latency

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::auth::{Decision, GateError, Stage};

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_decision(decision: &Decision, start: Instant) {
    let (stage, outcome) = decision_labels(decision);
    counter!("gate_decisions_total", "stage" => stage, "outcome" => outcome).increment(1);
    histogram!("gate_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream(status: u16, start: Instant) {
    counter!("gate_upstream_requests_total", "status" => status.to_string()).increment(1);
    histogram!("gate_upstream_duration_seconds").record(start.elapsed().as_secs_f64());
}

fn decision_labels(decision: &Decision) -> (&'static str, &'static str) {
    match decision {
        Decision::Allow(stage) => (stage.as_str(), "allow"),
        Decision::Deny(GateError::IdentityNotConfigured) => {
            (Stage::ServerIdentity.as_str(), GateError::IdentityNotConfigured.kind())
        }
        Decision::Deny(error) => (Stage::Permission.as_str(), error.kind()),
    }
}
