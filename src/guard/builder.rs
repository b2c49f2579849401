//! Builder shared by [`SyncGuard`] and [`AsyncGuard`].

use crate::circuit_breaker::{CircuitConfig, CircuitRegistry};
use crate::core::ConfigError;
use crate::guard::{AsyncGuard, SyncGuard};

use std::sync::Arc;
use std::time::Duration;

/// Builds a guard for one service.
///
/// The builder starts from the registry's baseline configuration for the
/// service (see [`BreakerSettings`](crate::circuit_breaker::BreakerSettings)).
/// Nothing is validated or registered until `build_*` is called.
///
/// ```rust
/// use quoteguard::circuit_breaker::CircuitRegistry;
/// use quoteguard::guard::SyncGuard;
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let registry = Arc::new(CircuitRegistry::new());
/// let guard = SyncGuard::builder(&registry, "broker")
///     .failure_threshold(3)
///     .timeout(Duration::from_secs(5))
///     .fallback("default-broker".to_string())
///     .build_sync()
///     .unwrap();
///
/// assert_eq!(guard.config().failure_threshold, 3);
/// ```
#[derive(Debug)]
pub struct GuardBuilder<T> {
    registry: Arc<CircuitRegistry>,
    service_id: String,
    config: CircuitConfig,
    timeout_secs: Option<f64>,
    fallback: Option<T>,
}

impl<T> GuardBuilder<T> {
    /// Creates a builder for `service_id`.
    pub fn new(registry: &Arc<CircuitRegistry>, service_id: impl Into<String>) -> Self {
        let service_id = service_id.into();
        Self {
            config: registry.baseline_config(&service_id),
            registry: Arc::clone(registry),
            service_id,
            timeout_secs: None,
            fallback: None,
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: CircuitConfig) -> Self {
        self.config = config;
        self.timeout_secs = None;
        self
    }

    /// Sets the number of consecutive failures that opens the circuit.
    pub fn failure_threshold(mut self, threshold: u32) -> Self {
        self.config.failure_threshold = threshold;
        self
    }

    /// Sets the number of half-open successes that closes the circuit.
    pub fn success_threshold(mut self, threshold: u32) -> Self {
        self.config.success_threshold = threshold;
        self
    }

    /// Sets how long the circuit stays open before admitting a probe.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self.timeout_secs = None;
        self
    }

    /// Sets the open timeout in fractional seconds. Checked at build time.
    pub fn timeout_secs(mut self, secs: f64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Sets the value returned instead of an error when a call is rejected.
    pub fn fallback(mut self, value: T) -> Self {
        self.fallback = Some(value);
        self
    }

    /// Builds a guard for blocking operations.
    pub fn build_sync(self) -> Result<SyncGuard<T>, ConfigError> {
        let (registry, service_id, config, fallback) = self.into_parts()?;
        SyncGuard::new(registry, &service_id, config, fallback)
    }

    /// Builds a guard for futures.
    pub fn build_async(self) -> Result<AsyncGuard<T>, ConfigError> {
        let (registry, service_id, config, fallback) = self.into_parts()?;
        AsyncGuard::new(registry, &service_id, config, fallback)
    }

    fn into_parts(
        self,
    ) -> Result<(Arc<CircuitRegistry>, String, CircuitConfig, Option<T>), ConfigError> {
        let config = match self.timeout_secs {
            Some(secs) => self.config.with_timeout_secs(secs)?,
            None => self.config,
        };
        Ok((self.registry, self.service_id, config, self.fallback))
    }
}
