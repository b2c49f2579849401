//! Operator interface over the circuit registry.
//!
//! [`CircuitAdmin`] is what an admin endpoint or a test harness holds: it can
//! list every circuit and force one back to closed, whether or not its open
//! timeout has elapsed.

use crate::circuit_breaker::CircuitRegistry;
use crate::core::{CircuitSnapshot, CircuitStatus};

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Inspects and resets circuits.
#[derive(Debug, Clone)]
pub struct CircuitAdmin {
    registry: Arc<CircuitRegistry>,
}

/// Count of circuits per state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StateSummary {
    /// Circuits in the closed state.
    pub closed: usize,
    /// Circuits in the open state.
    pub open: usize,
    /// Circuits in the half-open state.
    pub half_open: usize,
}

impl StateSummary {
    /// Returns `true` if every circuit is closed.
    pub fn all_closed(&self) -> bool {
        self.open == 0 && self.half_open == 0
    }
}

impl CircuitAdmin {
    /// Creates an admin handle over `registry`.
    pub fn new(registry: Arc<CircuitRegistry>) -> Self {
        Self { registry }
    }

    /// Returns a snapshot of every circuit, keyed by service id.
    pub fn get_all_states(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.registry.snapshot_all()
    }

    /// Returns a snapshot of one circuit.
    pub fn get_state(&self, service_id: &str) -> Option<CircuitSnapshot> {
        self.registry.snapshot(service_id)
    }

    /// Forces a circuit closed with zeroed counters. Idempotent.
    pub fn reset(&self, service_id: &str) -> CircuitSnapshot {
        tracing::info!(service_id, "Operator reset requested");
        self.registry.reset(service_id)
    }

    /// Resets every circuit. Returns how many were reset.
    pub fn reset_all(&self) -> usize {
        let count = self.registry.reset_all();
        tracing::info!(count, "Operator reset of all circuits");
        count
    }

    /// Returns the service ids whose circuit is not closed.
    pub fn tripped(&self) -> Vec<String> {
        self.get_all_states()
            .into_values()
            .filter(|s| !s.state.is_closed())
            .map(|s| s.service_id)
            .collect()
    }

    /// Counts circuits per state.
    pub fn summary(&self) -> StateSummary {
        self.get_all_states()
            .values()
            .fold(StateSummary::default(), |mut summary, s| {
                match s.state {
                    CircuitStatus::Closed => summary.closed += 1,
                    CircuitStatus::Open => summary.open += 1,
                    CircuitStatus::HalfOpen => summary.half_open += 1,
                }
                summary
            })
    }

    /// Renders all states as JSON, for an admin endpoint.
    pub fn states_json(&self) -> serde_json::Value {
        serde_json::json!({
            "summary": self.summary(),
            "circuits": self.get_all_states(),
        })
    }
}
