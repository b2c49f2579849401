//! Guard for blocking operations.

use crate::circuit_breaker::{CircuitConfig, CircuitRegistry};
use crate::core::{CircuitSnapshot, ConfigError, GuardError};
use crate::guard::builder::GuardBuilder;
use crate::guard::permit::GuardCore;

use std::sync::Arc;

/// Wraps blocking calls to one external dependency in a circuit breaker.
///
/// Each call consults the circuit, runs the operation if admitted, and reports
/// the outcome. The circuit lock is never held while the operation runs.
///
/// - Closed, or half-open with no probe running: the operation is invoked.
/// - Open before the timeout, or half-open with a probe running: the
///   operation is not invoked; the fallback is returned if configured,
///   otherwise [`GuardError::Unavailable`].
/// - Open after the timeout: the circuit goes half-open and this call is the
///   probe.
///
/// A failure of the operation itself is always returned as
/// [`GuardError::Dependency`], never replaced by the fallback.
///
/// # Example
///
/// ```rust
/// use quoteguard::circuit_breaker::{CircuitConfig, CircuitRegistry};
/// use quoteguard::guard::SyncGuard;
/// use std::sync::Arc;
///
/// let registry = Arc::new(CircuitRegistry::new());
/// let guard: SyncGuard<u32> =
///     SyncGuard::new(registry, "broker", CircuitConfig::default(), None).unwrap();
///
/// let fee = guard.call(|| Ok::<_, std::io::Error>(42)).unwrap();
/// assert_eq!(fee, 42);
/// ```
#[derive(Debug, Clone)]
pub struct SyncGuard<T> {
    core: GuardCore<T>,
}

impl<T> SyncGuard<T> {
    /// Creates a guard, registering the circuit on first use of `service_id`.
    ///
    /// Fails if `config` has a zero threshold or `service_id` is empty.
    pub fn new(
        registry: Arc<CircuitRegistry>,
        service_id: &str,
        config: CircuitConfig,
        fallback: Option<T>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            core: GuardCore::new(registry, service_id, config, fallback)?,
        })
    }

    /// Returns a builder for `service_id`.
    pub fn builder(registry: &Arc<CircuitRegistry>, service_id: impl Into<String>) -> GuardBuilder<T> {
        GuardBuilder::new(registry, service_id)
    }

    /// Returns the guarded service id.
    pub fn service_id(&self) -> &str {
        self.core.service_id()
    }

    /// Returns the configuration this guard registered with.
    pub fn config(&self) -> &CircuitConfig {
        self.core.config()
    }

    /// Returns the fallback value, if any.
    pub fn fallback(&self) -> Option<&T> {
        self.core.fallback()
    }

    /// Returns the registry this guard reports to.
    pub fn registry(&self) -> &Arc<CircuitRegistry> {
        self.core.registry()
    }

    /// Returns a snapshot of the guarded circuit.
    pub fn snapshot(&self) -> CircuitSnapshot {
        self.core.snapshot()
    }
}

impl<T: Clone> SyncGuard<T> {
    /// Runs `op` through the circuit.
    pub fn call<F, E>(&self, op: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let permit = match self.core.acquire() {
            Ok(permit) => permit,
            Err(rejection) => return self.core.reject(rejection),
        };

        let probe = permit.is_probe();
        match op() {
            Ok(value) => {
                permit.success();
                Ok(value)
            }
            Err(e) => {
                permit.failure();
                tracing::debug!(service_id = self.service_id(), probe, "Guarded call failed");
                Err(GuardError::Dependency(e))
            }
        }
    }

    /// Turns `op` into a guarded callable with the same shape.
    pub fn wrap<F, E>(self, op: F) -> impl Fn() -> Result<T, GuardError<E>>
    where
        F: Fn() -> Result<T, E>,
    {
        move || self.call(&op)
    }
}
