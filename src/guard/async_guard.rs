//! Guard for asynchronous operations.

#[cfg(feature = "tokio-runtime")]
use crate::audit::millis;
use crate::circuit_breaker::{CircuitConfig, CircuitRegistry};
use crate::core::{CircuitSnapshot, ConfigError, GuardError};
use crate::guard::builder::GuardBuilder;
use crate::guard::permit::GuardCore;

use std::future::Future;
use std::sync::Arc;
#[cfg(feature = "tokio-runtime")]
use std::time::Duration;

/// Wraps asynchronous calls to one external dependency in a circuit breaker.
///
/// Same state-machine contract as [`SyncGuard`](crate::guard::SyncGuard).
/// The decision before the call and the bookkeeping after it run without
/// suspending; the only `.await` is on the operation itself, and the circuit
/// lock is never held across it. Concurrent calls on the same service run
/// their operations concurrently while their state updates serialize.
///
/// If the returned future is dropped after the operation started, the call
/// is recorded as a failure.
///
/// # Example
///
/// ```rust,ignore
/// let guard = AsyncGuard::builder(&registry, "market_data")
///     .failure_threshold(3)
///     .build_async()?;
///
/// let quote = guard.call(|| provider.quote("EURUSD")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct AsyncGuard<T> {
    core: GuardCore<T>,
}

impl<T> AsyncGuard<T> {
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

impl<T: Clone> AsyncGuard<T> {
    /// Runs the future produced by `op` through the circuit.
    ///
    /// `op` is only called if the circuit admits the call.
    pub async fn call<F, Fut, E>(&self, op: F) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match self.core.acquire() {
            Ok(permit) => permit,
            Err(rejection) => return self.core.reject(rejection),
        };

        let probe = permit.is_probe();
        match op().await {
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

    /// Like [`call`](Self::call), but gives up after `deadline`.
    ///
    /// An expired deadline counts as a failure and is reported as
    /// [`GuardError::TimedOut`].
    #[cfg(feature = "tokio-runtime")]
    pub async fn call_with_timeout<F, Fut, E>(
        &self,
        deadline: Duration,
        op: F,
    ) -> Result<T, GuardError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match self.core.acquire() {
            Ok(permit) => permit,
            Err(rejection) => return self.core.reject(rejection),
        };

        match tokio::time::timeout(deadline, op()).await {
            Ok(Ok(value)) => {
                permit.success();
                Ok(value)
            }
            Ok(Err(e)) => {
                permit.failure();
                Err(GuardError::Dependency(e))
            }
            Err(_) => {
                permit.failure();
                tracing::warn!(
                    service_id = self.service_id(),
                    deadline_ms = millis(deadline),
                    "Guarded call timed out"
                );
                Err(GuardError::TimedOut {
                    service_id: self.service_id().to_string(),
                    elapsed: deadline,
                })
            }
        }
    }

    /// Binds `op` to this guard, producing a reusable guarded operation.
    pub fn wrap<F, Fut, E>(self, op: F) -> GuardedFn<T, F>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        GuardedFn { guard: self, op }
    }
}

/// An asynchronous operation bound to an [`AsyncGuard`].
#[derive(Debug, Clone)]
pub struct GuardedFn<T, F> {
    guard: AsyncGuard<T>,
    op: F,
}

impl<T, F> GuardedFn<T, F> {
    /// Returns the guard.
    pub fn guard(&self) -> &AsyncGuard<T> {
        &self.guard
    }
}

impl<T, F, Fut, E> GuardedFn<T, F>
where
    T: Clone,
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    /// Invokes the operation through the guard.
    pub async fn invoke(&self) -> Result<T, GuardError<E>> {
        self.guard.call(&self.op).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CircuitStatus, ManualClock};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq)]
    struct Boom;

    fn setup(fallback: Option<f64>) -> (Arc<ManualClock>, AsyncGuard<f64>) {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(CircuitRegistry::with_clock(clock.clone()));
        let config = CircuitConfig::new()
            .with_failure_threshold(3)
            .with_timeout(std::time::Duration::from_secs(5));
        let guard = AsyncGuard::new(registry, "market_data", config, fallback).unwrap();
        (clock, guard)
    }

    async fn trip(guard: &AsyncGuard<f64>) {
        for _ in 0..3 {
            let _ = guard.call(|| async { Err::<f64, _>(Boom) }).await;
        }
        assert_eq!(guard.snapshot().state, CircuitStatus::Open);
    }

    #[tokio::test]
    async fn test_passes_result_through() {
        let (_, guard) = setup(None);
        let price = guard.call(|| async { Ok::<_, Boom>(1.0842) }).await.unwrap();
        assert_eq!(price, 1.0842);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_invoking() {
        let (_, guard) = setup(None);
        trip(&guard).await;

        let calls = AtomicUsize::new(0);
        let result = guard
            .call(|| async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Boom>(1.0)
            })
            .await;

        assert!(result.unwrap_err().is_unavailable());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fallback_then_recovery() {
        let (clock, guard) = setup(Some(-1.0));
        trip(&guard).await;

        let price = guard.call(|| async { Ok::<_, Boom>(1.5) }).await.unwrap();
        assert_eq!(price, -1.0);

        clock.advance(std::time::Duration::from_secs(5));
        let price = guard.call(|| async { Ok::<_, Boom>(1.5) }).await.unwrap();
        assert_eq!(price, 1.5);
        assert!(guard.snapshot().is_pristine());
    }

    #[tokio::test]
    async fn test_single_probe_while_pending() {
        let (clock, guard) = setup(Some(0.0));
        trip(&guard).await;
        clock.advance(std::time::Duration::from_secs(6));

        let invocations = Arc::new(AtomicUsize::new(0));
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let probe = {
            let guard = guard.clone();
            let invocations = Arc::clone(&invocations);
            tokio::spawn(async move {
                guard
                    .call(|| async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        match release_rx.await {
                            Ok(()) => Ok::<_, Boom>(2.0),
                            Err(_) => Err(Boom),
                        }
                    })
                    .await
            })
        };

        while invocations.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let rejected = futures::future::join_all((0..4).map(|_| {
            guard.call(|| async {
                invocations.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Boom>(9.9)
            })
        }))
        .await;
        assert!(rejected.into_iter().all(|r| r.unwrap() == 0.0));

        release_tx.send(()).unwrap();
        assert_eq!(probe.await.unwrap().unwrap(), 2.0);
        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        assert_eq!(guard.snapshot().state, CircuitStatus::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_probe_reopens() {
        let (clock, guard) = setup(None);
        trip(&guard).await;
        clock.advance(std::time::Duration::from_secs(6));

        let cancelled = tokio::time::timeout(
            std::time::Duration::from_millis(10),
            guard.call(|| std::future::pending::<Result<f64, Boom>>()),
        )
        .await;
        assert!(cancelled.is_err());

        let snapshot = guard.snapshot();
        assert_eq!(snapshot.state, CircuitStatus::Open);
        assert_eq!(snapshot.metrics.times_opened, 2);
    }

    #[tokio::test]
    async fn test_call_with_timeout_counts_failure() {
        let (_, guard) = setup(None);

        let result = guard
            .call_with_timeout(std::time::Duration::from_millis(10), || async {
                tokio::time::sleep(std::time::Duration::from_secs(5)).await;
                Ok::<_, Boom>(1.0)
            })
            .await;

        assert!(matches!(result, Err(GuardError::TimedOut { .. })));
        assert_eq!(guard.snapshot().failure_count, 1);
    }

    #[tokio::test]
    async fn test_wrapped_operation() {
        let (_, guard) = setup(None);
        let calls = AtomicUsize::new(0);
        let latest_price = guard.wrap(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Boom>(3.25)
        });

        assert_eq!(latest_price.invoke().await.unwrap(), 3.25);
        assert_eq!(latest_price.invoke().await.unwrap(), 3.25);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(latest_price.guard().service_id(), "market_data");
    }
}
