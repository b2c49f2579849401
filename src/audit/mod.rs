//! Structured audit logging for circuit activity.
//!
//! Events are emitted through `tracing` on the `quoteguard::audit` target and
//! can be captured by any subscriber (JSON file, OpenTelemetry, etc.).

mod events;

pub(crate) use events::millis;
pub use events::{
    emit_call_rejected, emit_circuit_reset, emit_state_transition, AuditEvent, TransitionEvent,
};
