//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): relay attempts by chain and outcome
//! - `relay_counter_increment_failures_total` (counter): swallowed counter writes
//! - `relay_balance_lookup_failures_total` (counter): balance reads treated as zero
//! - `circuit_breaker_transitions_total` (counter): state changes by circuit and target state
//! - `circuit_breaker_rejections_total` (counter): calls refused by a circuit
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; a no-op until a recorder is installed
//! - Prometheus exposition on a dedicated listener

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::circuit_breaker::CircuitState;

/// Outcome label for `relay_requests_total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayOutcome {
    /// Forwarded to the provider successfully.
    Relayed,
    /// Refused because an address exhausted its quota.
    Limited,
    /// Refused before eligibility (unsupported or malformed payload).
    Rejected,
    /// The provider call failed.
    Failed,
}

impl RelayOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Relayed => "relayed",
            Self::Limited => "limited",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_relay(chain_id: &str, outcome: RelayOutcome) {
    counter!(
        "relay_requests_total",
        "chain_id" => chain_id.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
}

pub fn record_counter_increment_failure(chain_id: &str) {
    counter!("relay_counter_increment_failures_total", "chain_id" => chain_id.to_string())
        .increment(1);
}

pub fn record_balance_lookup_failure(chain_id: &str) {
    counter!("relay_balance_lookup_failures_total", "chain_id" => chain_id.to_string())
        .increment(1);
}

pub fn record_circuit_transition(circuit: &str, state: CircuitState) {
    counter!(
        "circuit_breaker_transitions_total",
        "circuit" => circuit.to_string(),
        "state" => state.as_str()
    )
    .increment(1);
}

pub fn record_circuit_rejection(circuit: &str) {
    counter!("circuit_breaker_rejections_total", "circuit" => circuit.to_string()).increment(1);
}
