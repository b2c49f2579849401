//! Core types shared by the registry, the guards and the admin interface.

use crate::circuit_breaker::{BreakerMetrics, CircuitConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The state of a circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitStatus {
    /// Calls pass through; failures are counted.
    Closed,
    /// Calls are rejected without touching the dependency.
    Open,
    /// A probe call is testing whether the dependency recovered.
    HalfOpen,
}

impl CircuitStatus {
    /// Returns the name of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }

    /// Returns `true` if calls currently pass through without restriction.
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Returns `true` if the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }

    /// Returns `true` if the circuit is half-open.
    pub fn is_half_open(&self) -> bool {
        matches!(self, Self::HalfOpen)
    }
}

impl fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A state change of one circuit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    /// State before the change.
    pub from: CircuitStatus,
    /// State after the change.
    pub to: CircuitStatus,
}

impl Transition {
    pub(crate) fn new(from: CircuitStatus, to: CircuitStatus) -> Self {
        Self { from, to }
    }
}

/// A point-in-time view of one circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitSnapshot {
    /// The service this circuit guards.
    pub service_id: String,

    /// Current state.
    pub state: CircuitStatus,

    /// Consecutive failures observed while closed.
    pub failure_count: u32,

    /// Consecutive successes observed while half-open.
    pub success_count: u32,

    /// When the circuit last opened. Only set while open.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,

    /// Thresholds currently in force.
    pub config: CircuitConfig,

    /// Request counters since creation or the last reset.
    pub metrics: BreakerMetrics,
}

impl CircuitSnapshot {
    /// Returns `true` if the circuit is closed with both counters at zero.
    pub fn is_pristine(&self) -> bool {
        self.state.is_closed() && self.failure_count == 0 && self.success_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_names() {
        assert_eq!(CircuitStatus::Closed.name(), "closed");
        assert_eq!(CircuitStatus::Open.to_string(), "open");
        assert_eq!(CircuitStatus::HalfOpen.name(), "half_open");
    }

    #[test]
    fn test_status_serializes_upper_case() {
        let json = serde_json::to_string(&CircuitStatus::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
    }

    #[test]
    fn test_snapshot_omits_missing_opened_at() {
        let snapshot = CircuitSnapshot {
            service_id: "market_data".into(),
            state: CircuitStatus::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            config: CircuitConfig::default(),
            metrics: BreakerMetrics::default(),
        };

        assert!(snapshot.is_pristine());
        let value = serde_json::to_value(&snapshot).unwrap();
        assert!(value.get("opened_at").is_none());
        assert_eq!(value["state"], "CLOSED");
    }
}
