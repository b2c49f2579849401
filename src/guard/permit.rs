//! Admission and outcome bookkeeping shared by both guards.

use crate::audit::emit_call_rejected;
use crate::circuit_breaker::{Admission, Circuit, CircuitConfig, CircuitRegistry, Ticket};
use crate::core::{CircuitSnapshot, ConfigError, GuardError, ServiceUnavailable};

use std::sync::Arc;

/// Everything a guard needs: its circuit, its thresholds and its fallback.
#[derive(Debug, Clone)]
pub(crate) struct GuardCore<T> {
    registry: Arc<CircuitRegistry>,
    circuit: Arc<Circuit>,
    config: CircuitConfig,
    fallback: Option<T>,
}

impl<T> GuardCore<T> {
    pub(crate) fn new(
        registry: Arc<CircuitRegistry>,
        service_id: &str,
        config: CircuitConfig,
        fallback: Option<T>,
    ) -> Result<Self, ConfigError> {
        if service_id.is_empty() {
            return Err(ConfigError::invalid("service_id", "must not be empty"));
        }
        config.validate()?;

        let circuit = registry.register(service_id, &config);
        Ok(Self {
            registry,
            circuit,
            config,
            fallback,
        })
    }

    pub(crate) fn service_id(&self) -> &str {
        self.circuit.service_id()
    }

    pub(crate) fn config(&self) -> &CircuitConfig {
        &self.config
    }

    pub(crate) fn fallback(&self) -> Option<&T> {
        self.fallback.as_ref()
    }

    pub(crate) fn registry(&self) -> &Arc<CircuitRegistry> {
        &self.registry
    }

    pub(crate) fn snapshot(&self) -> CircuitSnapshot {
        self.circuit.snapshot()
    }

    /// Consults the circuit. The circuit lock is released before this returns.
    pub(crate) fn acquire(&self) -> Result<CallPermit, ServiceUnavailable> {
        let now = self.registry.now();
        match self.circuit.claim_and_admit(&self.config, now) {
            Admission::Permitted(ticket) => Ok(CallPermit {
                circuit: Arc::clone(&self.circuit),
                registry: Arc::clone(&self.registry),
                ticket,
                settled: false,
            }),
            Admission::Rejected {
                status,
                retry_after,
            } => Err(ServiceUnavailable::new(self.service_id(), status).with_retry_after(retry_after)),
        }
    }
}

impl<T: Clone> GuardCore<T> {
    /// Resolves a rejected call to the fallback, or to the rejection error.
    pub(crate) fn reject<E>(&self, rejection: ServiceUnavailable) -> Result<T, GuardError<E>> {
        emit_call_rejected(&rejection, self.fallback.is_some());
        match &self.fallback {
            Some(value) => Ok(value.clone()),
            None => Err(GuardError::Unavailable(rejection)),
        }
    }
}

/// An admitted call whose outcome has not been reported yet.
///
/// Dropping an unsettled permit records a failure. This covers futures that
/// are cancelled mid-call and blocking operations that panic, and always
/// releases the half-open probe slot.
#[derive(Debug)]
pub(crate) struct CallPermit {
    circuit: Arc<Circuit>,
    registry: Arc<CircuitRegistry>,
    ticket: Ticket,
    settled: bool,
}

impl CallPermit {
    pub(crate) fn is_probe(&self) -> bool {
        self.ticket.is_probe()
    }

    pub(crate) fn success(mut self) {
        self.settled = true;
        self.circuit.record_success(self.ticket, self.registry.now());
    }

    pub(crate) fn failure(mut self) {
        self.settled = true;
        self.circuit.record_failure(self.ticket, self.registry.now());
    }
}

impl Drop for CallPermit {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::debug!(
            service_id = self.circuit.service_id(),
            probe = self.ticket.is_probe(),
            "Guarded call abandoned before completion, recording failure"
        );
        self.circuit.record_failure(self.ticket, self.registry.now());
    }
}
