//! Circuit breaker state machine.
//!
//! [`CircuitState`] holds no lock and reads no clock. The caller passes the
//! current time in and serializes access; see
//! [`Circuit`](crate::circuit_breaker::Circuit).

use crate::circuit_breaker::config::CircuitConfig;
use crate::core::clock::elapsed_between;
use crate::core::{CircuitSnapshot, CircuitStatus, Transition};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Proof that a call was admitted, tied to the epoch it was admitted in.
///
/// Every state change bumps the circuit's epoch. Outcomes carrying an older
/// epoch only update metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket {
    epoch: u64,
    probe: bool,
}

impl Ticket {
    /// Returns `true` if this call is the half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }
}

/// The answer to "may this call go ahead?".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Invoke the operation and report its outcome with the ticket.
    Permitted(Ticket),
    /// Do not invoke the operation.
    Rejected {
        /// State the circuit was in.
        status: CircuitStatus,
        /// Time left until a probe is admitted, if the circuit is open.
        retry_after: Option<Duration>,
    },
}

/// The mutable state of one circuit.
#[derive(Debug, Clone)]
pub struct CircuitState {
    status: CircuitStatus,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<DateTime<Utc>>,
    probe_in_flight: bool,
    epoch: u64,
    config: CircuitConfig,
    claimed: bool,
    metrics: BreakerMetrics,
}

impl CircuitState {
    /// Creates a closed circuit with zero counters.
    pub fn new(config: CircuitConfig) -> Self {
        Self {
            status: CircuitStatus::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            probe_in_flight: false,
            epoch: 0,
            config,
            claimed: false,
            metrics: BreakerMetrics::new(),
        }
    }

    /// Creates a closed circuit whose configuration is already authoritative.
    pub fn claimed(config: CircuitConfig) -> Self {
        Self {
            claimed: true,
            ..Self::new(config)
        }
    }

    /// Returns the current state.
    pub fn status(&self) -> CircuitStatus {
        self.status
    }

    /// Returns the consecutive failure count.
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    /// Returns the consecutive half-open success count.
    pub fn success_count(&self) -> u32 {
        self.success_count
    }

    /// Returns when the circuit opened, if it is open.
    pub fn opened_at(&self) -> Option<DateTime<Utc>> {
        self.opened_at
    }

    /// Returns the thresholds in force.
    pub fn config(&self) -> &CircuitConfig {
        &self.config
    }

    /// Returns the request counters.
    pub fn metrics(&self) -> &BreakerMetrics {
        &self.metrics
    }

    /// Returns `true` if a half-open probe is running.
    pub fn probe_in_flight(&self) -> bool {
        self.probe_in_flight
    }

    /// Installs `config` unless an earlier registration already did.
    ///
    /// Returns `true` if the configuration was adopted.
    pub fn claim(&mut self, config: &CircuitConfig) -> bool {
        if self.claimed {
            return false;
        }
        self.config = config.clone();
        self.claimed = true;
        true
    }

    /// Decides whether a call may proceed, moving an expired open circuit to
    /// half-open.
    pub fn admit(&mut self, now: DateTime<Utc>) -> (Admission, Option<Transition>) {
        match self.status {
            CircuitStatus::Closed => (Admission::Permitted(self.ticket(false)), None),

            CircuitStatus::Open => {
                let elapsed = self
                    .opened_at
                    .map(|at| elapsed_between(at, now))
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.config.timeout {
                    let transition = self.enter(CircuitStatus::HalfOpen);
                    self.probe_in_flight = true;
                    (Admission::Permitted(self.ticket(true)), Some(transition))
                } else {
                    self.metrics.record_rejected();
                    (
                        Admission::Rejected {
                            status: CircuitStatus::Open,
                            retry_after: Some(self.config.timeout - elapsed),
                        },
                        None,
                    )
                }
            }

            CircuitStatus::HalfOpen => {
                if self.probe_in_flight {
                    self.metrics.record_rejected();
                    (
                        Admission::Rejected {
                            status: CircuitStatus::HalfOpen,
                            retry_after: None,
                        },
                        None,
                    )
                } else {
                    self.probe_in_flight = true;
                    (Admission::Permitted(self.ticket(true)), None)
                }
            }
        }
    }

    /// Records a successful call.
    pub fn record_success(&mut self, ticket: Ticket) -> Option<Transition> {
        self.metrics.record_success();
        if ticket.epoch != self.epoch {
            return None;
        }

        match self.status {
            CircuitStatus::Closed => {
                self.failure_count = 0;
                None
            }

            CircuitStatus::HalfOpen => {
                self.probe_in_flight = false;
                if self.success_count + 1 >= self.config.success_threshold {
                    self.metrics.record_closed();
                    Some(self.enter(CircuitStatus::Closed))
                } else {
                    self.success_count += 1;
                    None
                }
            }

            // Open always starts a new epoch, so no ticket can match it.
            CircuitStatus::Open => None,
        }
    }

    /// Records a failed call.
    pub fn record_failure(&mut self, ticket: Ticket, now: DateTime<Utc>) -> Option<Transition> {
        self.metrics.record_failure();
        if ticket.epoch != self.epoch {
            return None;
        }

        match self.status {
            CircuitStatus::Closed => {
                if self.failure_count + 1 >= self.config.failure_threshold {
                    Some(self.trip(now))
                } else {
                    self.failure_count += 1;
                    None
                }
            }

            CircuitStatus::HalfOpen => {
                self.probe_in_flight = false;
                Some(self.trip(now))
            }

            CircuitStatus::Open => None,
        }
    }

    /// Forces the circuit closed with zeroed counters and metrics.
    ///
    /// `baseline` replaces the configuration and the circuit becomes
    /// unclaimed, so the next registering guard installs its own thresholds.
    pub fn reset(&mut self, baseline: CircuitConfig) -> Option<Transition> {
        let from = self.status;
        *self = Self {
            epoch: self.epoch.wrapping_add(1),
            ..Self::new(baseline)
        };
        (from != CircuitStatus::Closed).then(|| Transition::new(from, CircuitStatus::Closed))
    }

    /// Returns a point-in-time view of this circuit.
    pub fn snapshot(&self, service_id: &str) -> CircuitSnapshot {
        CircuitSnapshot {
            service_id: service_id.to_string(),
            state: self.status,
            failure_count: self.failure_count,
            success_count: self.success_count,
            opened_at: self.opened_at,
            config: self.config.clone(),
            metrics: self.metrics.clone(),
        }
    }

    fn ticket(&self, probe: bool) -> Ticket {
        Ticket {
            epoch: self.epoch,
            probe,
        }
    }

    fn trip(&mut self, now: DateTime<Utc>) -> Transition {
        let transition = self.enter(CircuitStatus::Open);
        self.opened_at = Some(now);
        self.metrics.record_opened();
        transition
    }

    /// Moves to `to`, clearing counters and starting a new epoch.
    fn enter(&mut self, to: CircuitStatus) -> Transition {
        let transition = Transition::new(self.status, to);
        self.status = to;
        self.failure_count = 0;
        self.success_count = 0;
        self.opened_at = None;
        self.probe_in_flight = false;
        self.epoch = self.epoch.wrapping_add(1);
        transition
    }
}

/// Metrics about circuit breaker behavior.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakerMetrics {
    /// Total number of calls, including rejected ones.
    pub total_requests: u64,
    /// Number of calls whose operation succeeded.
    pub successful_requests: u64,
    /// Number of calls whose operation failed.
    pub failed_requests: u64,
    /// Number of calls rejected without invoking the operation.
    pub rejected_requests: u64,
    /// Number of times the circuit has opened.
    pub times_opened: u64,
    /// Number of times the circuit has closed from half-open.
    pub times_closed: u64,
}

impl BreakerMetrics {
    /// Creates new empty metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful request.
    pub fn record_success(&mut self) {
        self.total_requests += 1;
        self.successful_requests += 1;
    }

    /// Records a failed request.
    pub fn record_failure(&mut self) {
        self.total_requests += 1;
        self.failed_requests += 1;
    }

    /// Records a rejected request.
    pub fn record_rejected(&mut self) {
        self.total_requests += 1;
        self.rejected_requests += 1;
    }

    /// Records that the circuit opened.
    pub fn record_opened(&mut self) {
        self.times_opened += 1;
    }

    /// Records that the circuit closed.
    pub fn record_closed(&mut self) {
        self.times_closed += 1;
    }

    /// Returns the success rate (0.0 to 1.0).
    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 1.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }

    /// Returns the failure rate (0.0 to 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.failed_requests as f64 / self.total_requests as f64
    }
}
