//! Audit event types and emission functions.

use crate::core::{CircuitStatus, ServiceUnavailable, Transition};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Base trait for audit events.
pub trait AuditEvent: Serialize {
    /// Returns the event type name.
    fn event_type(&self) -> &'static str;

    /// Returns the timestamp of the event.
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Audit event for a circuit changing state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionEvent {
    /// The service whose circuit changed state.
    pub service_id: String,

    /// State before the change.
    pub from: CircuitStatus,

    /// State after the change.
    pub to: CircuitStatus,

    /// When the change happened.
    pub timestamp: DateTime<Utc>,
}

impl TransitionEvent {
    /// Creates a new transition event.
    pub fn new(service_id: impl Into<String>, transition: Transition, at: DateTime<Utc>) -> Self {
        Self {
            service_id: service_id.into(),
            from: transition.from,
            to: transition.to,
            timestamp: at,
        }
    }
}

impl AuditEvent for TransitionEvent {
    fn event_type(&self) -> &'static str {
        "circuit_transition"
    }

    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Emits an audit event for a state transition.
///
/// Opening a circuit is logged at `warn`; everything else at `info`.
pub fn emit_state_transition(event: &TransitionEvent) {
    if event.to.is_open() {
        tracing::warn!(
            target: "quoteguard::audit",
            event_type = event.event_type(),
            service_id = %event.service_id,
            from = %event.from,
            to = %event.to,
            timestamp = %event.timestamp,
            "Circuit opened"
        );
    } else {
        tracing::info!(
            target: "quoteguard::audit",
            event_type = event.event_type(),
            service_id = %event.service_id,
            from = %event.from,
            to = %event.to,
            timestamp = %event.timestamp,
            "Circuit state changed"
        );
    }
}

/// Emits an audit event for a call the circuit refused to make.
///
/// Logged at `debug`: an open circuit sees one of these per incoming call.
pub fn emit_call_rejected(rejection: &ServiceUnavailable, fallback_used: bool) {
    tracing::debug!(
        target: "quoteguard::audit",
        event_type = "call_rejected",
        service_id = %rejection.service_id,
        state = %rejection.state,
        retry_after_ms = rejection.retry_after.map(millis),
        fallback_used,
        "Call rejected by circuit"
    );
}

/// Emits an audit event for an operator reset.
pub fn emit_circuit_reset(service_id: &str, previous: CircuitStatus, at: DateTime<Utc>) {
    tracing::info!(
        target: "quoteguard::audit",
        event_type = "circuit_reset",
        service_id = %service_id,
        previous_state = %previous,
        timestamp = %at,
        "Circuit reset"
    );
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
