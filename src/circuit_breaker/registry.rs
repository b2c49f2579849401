//! The process-wide circuit registry.

use crate::audit::{emit_circuit_reset, emit_state_transition, TransitionEvent};
use crate::circuit_breaker::config::CircuitConfig;
use crate::circuit_breaker::settings::BreakerSettings;
use crate::circuit_breaker::state::{Admission, CircuitState, Ticket};
use crate::core::{CircuitSnapshot, CircuitStatus, Clock, SystemClock, Transition};

use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

/// One circuit: a service id and its lock-protected state.
///
/// All reads that lead to a transition happen with the circuit's own lock
/// held. Audit events are emitted after the lock is released.
pub struct Circuit {
    service_id: String,
    state: Mutex<CircuitState>,
}

impl Circuit {
    fn new(service_id: String, state: CircuitState) -> Self {
        Self {
            service_id,
            state: Mutex::new(state),
        }
    }

    /// Returns the service id.
    pub fn service_id(&self) -> &str {
        &self.service_id
    }

    /// Returns the current state.
    pub fn status(&self) -> CircuitStatus {
        self.lock().status()
    }

    /// Returns a point-in-time view of this circuit.
    pub fn snapshot(&self) -> CircuitSnapshot {
        self.lock().snapshot(&self.service_id)
    }

    /// Installs `config` if no guard has claimed this circuit since it was
    /// created or last reset.
    pub fn claim(&self, config: &CircuitConfig) -> bool {
        self.lock().claim(config)
    }

    /// Asks the state machine whether a call may proceed.
    pub fn admit(&self, now: DateTime<Utc>) -> Admission {
        let (admission, transition) = self.lock().admit(now);
        self.audit(transition, now);
        admission
    }

    /// Claims the circuit for `config` if unclaimed, then admits, under one
    /// lock acquisition.
    pub fn claim_and_admit(&self, config: &CircuitConfig, now: DateTime<Utc>) -> Admission {
        let (admission, transition) = {
            let mut state = self.lock();
            state.claim(config);
            state.admit(now)
        };
        self.audit(transition, now);
        admission
    }

    /// Reports a successful call.
    pub fn record_success(&self, ticket: Ticket, now: DateTime<Utc>) {
        let transition = self.lock().record_success(ticket);
        self.audit(transition, now);
    }

    /// Reports a failed call.
    pub fn record_failure(&self, ticket: Ticket, now: DateTime<Utc>) {
        let transition = self.lock().record_failure(ticket, now);
        self.audit(transition, now);
    }

    fn reset(&self, baseline: CircuitConfig, now: DateTime<Utc>) -> CircuitSnapshot {
        let (previous, snapshot) = {
            let mut state = self.lock();
            let previous = state.status();
            state.reset(baseline);
            (previous, state.snapshot(&self.service_id))
        };
        emit_circuit_reset(&self.service_id, previous, now);
        snapshot
    }

    fn lock(&self) -> MutexGuard<'_, CircuitState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn audit(&self, transition: Option<Transition>, now: DateTime<Utc>) {
        if let Some(transition) = transition {
            emit_state_transition(&TransitionEvent::new(&self.service_id, transition, now));
        }
    }
}

impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Circuit")
            .field("service_id", &self.service_id)
            .field("state", &*self.lock())
            .finish()
    }
}

/// Maps service ids to circuits.
///
/// Construct one per process and share it by `Arc`. Lookups of existing
/// circuits take a read lock on the map; only the first use of a service id
/// takes the write lock.
///
/// # Example
///
/// ```rust
/// use quoteguard::circuit_breaker::{CircuitConfig, CircuitRegistry};
///
/// let registry = CircuitRegistry::new();
/// let circuit = registry.register("market_data", &CircuitConfig::default());
/// assert!(circuit.status().is_closed());
/// assert_eq!(registry.len(), 1);
/// ```
pub struct CircuitRegistry {
    circuits: RwLock<HashMap<String, Arc<Circuit>>>,
    settings: BreakerSettings,
    clock: Arc<dyn Clock>,
}

impl CircuitRegistry {
    /// Creates an empty registry using the system clock and default settings.
    pub fn new() -> Self {
        Self::with_parts(BreakerSettings::default(), Arc::new(SystemClock))
    }

    /// Creates an empty registry reading time from `clock`.
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self::with_parts(BreakerSettings::default(), clock)
    }

    /// Creates an empty registry whose baseline configs come from `settings`.
    pub fn with_settings(settings: BreakerSettings) -> Self {
        Self::with_parts(settings, Arc::new(SystemClock))
    }

    /// Creates an empty registry from settings and a clock.
    pub fn with_parts(settings: BreakerSettings, clock: Arc<dyn Clock>) -> Self {
        Self {
            circuits: RwLock::new(HashMap::new()),
            settings,
            clock,
        }
    }

    /// Returns the current time according to the registry's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Returns the settings.
    pub fn settings(&self) -> &BreakerSettings {
        &self.settings
    }

    /// Returns the configuration a circuit falls back to on reset, and the
    /// starting point for guard builders.
    pub fn baseline_config(&self, service_id: &str) -> CircuitConfig {
        self.settings.config_for(service_id)
    }

    /// Returns the circuit for `service_id`, creating it with `config` on
    /// first use. An existing circuit keeps its configuration unless it was
    /// reset and not yet claimed again.
    pub fn register(&self, service_id: &str, config: &CircuitConfig) -> Arc<Circuit> {
        if let Some(circuit) = self.get(service_id) {
            circuit.claim(config);
            return circuit;
        }

        let mut circuits = self
            .circuits
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let circuit = circuits
            .entry(service_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(service_id, "Registering circuit");
                Arc::new(Circuit::new(
                    service_id.to_string(),
                    CircuitState::claimed(config.clone()),
                ))
            })
            .clone();
        drop(circuits);

        circuit.claim(config);
        circuit
    }

    /// Returns the circuit for `service_id`, if one exists.
    pub fn get(&self, service_id: &str) -> Option<Arc<Circuit>> {
        self.circuits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(service_id)
            .cloned()
    }

    /// Returns a snapshot of every circuit, keyed by service id.
    ///
    /// Each circuit is captured under its own lock, so the map is consistent
    /// per circuit, not across circuits.
    pub fn snapshot_all(&self) -> BTreeMap<String, CircuitSnapshot> {
        self.circuits()
            .into_iter()
            .map(|circuit| (circuit.service_id.clone(), circuit.snapshot()))
            .collect()
    }

    /// Returns a snapshot of one circuit.
    pub fn snapshot(&self, service_id: &str) -> Option<CircuitSnapshot> {
        self.get(service_id).map(|circuit| circuit.snapshot())
    }

    /// Forces a circuit closed with zeroed counters and its baseline config.
    ///
    /// Creates the circuit if it does not exist yet.
    pub fn reset(&self, service_id: &str) -> CircuitSnapshot {
        let baseline = self.baseline_config(service_id);
        let circuit = match self.get(service_id) {
            Some(circuit) => circuit,
            None => {
                let mut circuits = self
                    .circuits
                    .write()
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                circuits
                    .entry(service_id.to_string())
                    .or_insert_with(|| {
                        Arc::new(Circuit::new(
                            service_id.to_string(),
                            CircuitState::new(baseline.clone()),
                        ))
                    })
                    .clone()
            }
        };
        circuit.reset(baseline, self.now())
    }

    /// Resets every circuit. Returns how many were reset.
    pub fn reset_all(&self) -> usize {
        let circuits = self.circuits();
        for circuit in &circuits {
            circuit.reset(self.baseline_config(&circuit.service_id), self.now());
        }
        circuits.len()
    }

    /// Returns the registered service ids, sorted.
    pub fn service_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .circuits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }

    /// Returns the number of circuits.
    pub fn len(&self) -> usize {
        self.circuits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    /// Returns `true` if no circuit has been created yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn circuits(&self) -> Vec<Arc<Circuit>> {
        self.circuits
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect()
    }
}

impl Default for CircuitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CircuitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitRegistry")
            .field("services", &self.service_ids())
            .field("clock", &self.clock)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ManualClock;
    use std::time::Duration;

    fn quick() -> CircuitConfig {
        CircuitConfig::new()
            .with_failure_threshold(2)
            .with_timeout(Duration::from_secs(5))
    }

    fn fail(circuit: &Circuit, now: DateTime<Utc>) {
        match circuit.admit(now) {
            Admission::Permitted(ticket) => circuit.record_failure(ticket, now),
            Admission::Rejected { .. } => panic!("call unexpectedly rejected"),
        }
    }

    #[test]
    fn test_register_returns_same_circuit() {
        let registry = CircuitRegistry::new();
        let first = registry.register("broker", &quick());
        let second = registry.register("broker", &CircuitConfig::default());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 1);
        // First registration wins.
        assert_eq!(second.snapshot().config, quick());
    }

    #[test]
    fn test_circuits_are_independent() {
        let registry = CircuitRegistry::new();
        let now = registry.now();
        let broker = registry.register("broker", &quick());
        let market = registry.register("market_data", &quick());

        fail(&broker, now);
        fail(&broker, now);

        assert_eq!(broker.status(), CircuitStatus::Open);
        assert_eq!(market.status(), CircuitStatus::Closed);
        assert_eq!(market.snapshot().failure_count, 0);
    }

    #[test]
    fn test_snapshot_all() {
        let registry = CircuitRegistry::new();
        let now = registry.now();
        registry.register("market_data", &quick());
        let broker = registry.register("broker", &quick());
        fail(&broker, now);

        let states = registry.snapshot_all();
        assert_eq!(
            states.keys().cloned().collect::<Vec<_>>(),
            vec!["broker".to_string(), "market_data".to_string()]
        );
        assert_eq!(states["broker"].failure_count, 1);
        assert_eq!(states["market_data"].state, CircuitStatus::Closed);
    }

    #[test]
    fn test_reset_creates_missing_entry() {
        let registry = CircuitRegistry::new();
        let snapshot = registry.reset("unknown");

        assert!(snapshot.is_pristine());
        assert_eq!(snapshot.config, CircuitConfig::default());
        assert_eq!(registry.service_ids(), vec!["unknown".to_string()]);
    }

    #[test]
    fn test_reset_restores_baseline_then_next_guard_claims() {
        let registry = CircuitRegistry::new();
        let now = registry.now();
        let circuit = registry.register("broker", &quick());
        fail(&circuit, now);
        fail(&circuit, now);
        assert!(circuit.status().is_open());

        let snapshot = registry.reset("broker");
        assert!(snapshot.is_pristine());
        assert!(snapshot.opened_at.is_none());
        assert_eq!(snapshot.config, CircuitConfig::default());

        registry.register("broker", &quick());
        assert_eq!(circuit.snapshot().config, quick());
    }

    #[test]
    fn test_reset_all() {
        let registry = CircuitRegistry::new();
        let now = registry.now();
        let a = registry.register("a", &quick());
        let b = registry.register("b", &quick());
        fail(&a, now);
        fail(&a, now);
        fail(&b, now);

        assert_eq!(registry.reset_all(), 2);
        assert!(registry.snapshot_all().values().all(|s| s.is_pristine()));
    }

    #[test]
    fn test_registry_uses_injected_clock() {
        let clock = Arc::new(ManualClock::new());
        let registry = CircuitRegistry::with_clock(clock.clone());
        let circuit = registry.register("broker", &quick());

        fail(&circuit, registry.now());
        fail(&circuit, registry.now());
        assert!(matches!(
            circuit.admit(registry.now()),
            Admission::Rejected { .. }
        ));

        clock.advance(Duration::from_secs(5));
        assert!(matches!(
            circuit.admit(registry.now()),
            Admission::Permitted(_)
        ));
        assert_eq!(circuit.status(), CircuitStatus::HalfOpen);
    }

    #[test]
    fn test_concurrent_registration_creates_one_circuit() {
        let registry = Arc::new(CircuitRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.register("shared", &CircuitConfig::default()))
            })
            .collect();

        let circuits: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(circuits.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
        assert_eq!(registry.len(), 1);
    }
}
