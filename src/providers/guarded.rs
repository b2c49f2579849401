//! Providers wrapped in circuit breakers.
//!
//! The wrappers implement the same trait as what they wrap, so callers can
//! swap a raw provider for a guarded one without changing their code.

use crate::circuit_breaker::{CircuitConfig, CircuitRegistry};
use crate::core::{CircuitSnapshot, ConfigError, ProviderError};
use crate::guard::{AsyncGuard, SyncGuard};
use crate::providers::traits::{BrokerConfig, BrokerConfigProvider, MarketDataProvider, Quote};

use async_trait::async_trait;
use std::sync::Arc;
#[cfg(feature = "tokio-runtime")]
use std::time::Duration;

/// A [`MarketDataProvider`] behind an [`AsyncGuard`].
///
/// # Example
///
/// ```rust,ignore
/// let feed = GuardedMarketData::new(
///     FeedClient::connect(url).await?,
///     Arc::clone(&registry),
///     CircuitConfig::new().with_failure_threshold(3),
/// )?;
///
/// match feed.quote("EURUSD").await {
///     Ok(quote) => println!("mid {}", quote.mid()),
///     Err(e) if e.status_code() == 503 => println!("feed is resting"),
///     Err(e) => return Err(e.into()),
/// }
/// ```
#[derive(Debug)]
pub struct GuardedMarketData<P> {
    inner: P,
    guard: AsyncGuard<Quote>,
    #[cfg(feature = "tokio-runtime")]
    deadline: Option<Duration>,
}

impl<P: MarketDataProvider> GuardedMarketData<P> {
    /// Guards `inner` under a circuit named after the provider.
    pub fn new(
        inner: P,
        registry: Arc<CircuitRegistry>,
        config: CircuitConfig,
    ) -> Result<Self, ConfigError> {
        let guard = AsyncGuard::new(registry, inner.name(), config, None)?;
        Ok(Self::with_guard(inner, guard))
    }

    /// Guards `inner` with an existing guard.
    pub fn with_guard(inner: P, guard: AsyncGuard<Quote>) -> Self {
        Self {
            inner,
            guard,
            #[cfg(feature = "tokio-runtime")]
            deadline: None,
        }
    }

    /// Treats calls that take longer than `deadline` as failures.
    #[cfg(feature = "tokio-runtime")]
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Returns the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Returns the guard.
    pub fn guard(&self) -> &AsyncGuard<Quote> {
        &self.guard
    }

    /// Returns a snapshot of the provider's circuit.
    pub fn circuit(&self) -> CircuitSnapshot {
        self.guard.snapshot()
    }
}

#[async_trait]
impl<P: MarketDataProvider> MarketDataProvider for GuardedMarketData<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        #[cfg(feature = "tokio-runtime")]
        if let Some(deadline) = self.deadline {
            return self
                .guard
                .call_with_timeout(deadline, || self.inner.quote(symbol))
                .await
                .map_err(ProviderError::from);
        }

        self.guard
            .call(|| self.inner.quote(symbol))
            .await
            .map_err(ProviderError::from)
    }
}

/// A [`BrokerConfigProvider`] behind a [`SyncGuard`].
#[derive(Debug)]
pub struct GuardedBrokerConfig<P> {
    inner: P,
    guard: SyncGuard<BrokerConfig>,
}

impl<P: BrokerConfigProvider> GuardedBrokerConfig<P> {
    /// Guards `inner` under a circuit named after the provider.
    pub fn new(
        inner: P,
        registry: Arc<CircuitRegistry>,
        config: CircuitConfig,
    ) -> Result<Self, ConfigError> {
        let guard = SyncGuard::new(registry, inner.name(), config, None)?;
        Ok(Self { inner, guard })
    }

    /// Guards `inner` with an existing guard.
    pub fn with_guard(inner: P, guard: SyncGuard<BrokerConfig>) -> Self {
        Self { inner, guard }
    }

    /// Returns the wrapped provider.
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Returns a snapshot of the provider's circuit.
    pub fn circuit(&self) -> CircuitSnapshot {
        self.guard.snapshot()
    }
}

impl<P: BrokerConfigProvider> BrokerConfigProvider for GuardedBrokerConfig<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn broker_config(&self, broker_id: &str) -> Result<BrokerConfig, ProviderError> {
        self.guard
            .call(|| self.inner.broker_config(broker_id))
            .map_err(ProviderError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CircuitStatus, ManualClock};
    use crate::providers::mock::{MockBrokerConfig, MockMarketData};
    use std::time::Duration;

    fn registry() -> (Arc<ManualClock>, Arc<CircuitRegistry>) {
        let clock = Arc::new(ManualClock::new());
        let registry = Arc::new(CircuitRegistry::with_clock(clock.clone()));
        (clock, registry)
    }

    #[tokio::test]
    async fn test_guarded_market_data_trips_and_recovers() {
        let (clock, registry) = registry();
        let config = CircuitConfig::new()
            .with_failure_threshold(2)
            .with_timeout(Duration::from_secs(30));
        let feed = GuardedMarketData::new(
            MockMarketData::new().with_quote("EURUSD", 1.0840, 1.0844),
            Arc::clone(&registry),
            config,
        )
        .unwrap();

        feed.inner().set_failing(true);
        for _ in 0..2 {
            let err = feed.quote("EURUSD").await.unwrap_err();
            assert_eq!(err.status_code(), 502);
        }
        assert_eq!(feed.circuit().state, CircuitStatus::Open);

        let err = feed.quote("EURUSD").await.unwrap_err();
        assert_eq!(err.status_code(), 503);
        assert_eq!(feed.inner().call_count(), 2);

        feed.inner().set_failing(false);
        clock.advance(Duration::from_secs(30));
        let quote = feed.quote("EURUSD").await.unwrap();
        assert_eq!(quote.symbol, "EURUSD");
        assert_eq!(feed.circuit().state, CircuitStatus::Closed);
    }

    #[tokio::test]
    async fn test_guarded_market_data_shares_registry_name() {
        let (_, registry) = registry();
        let feed = GuardedMarketData::new(
            MockMarketData::new().with_name("refinitiv"),
            Arc::clone(&registry),
            CircuitConfig::default(),
        )
        .unwrap();

        assert_eq!(feed.name(), "refinitiv");
        assert!(registry.snapshot("refinitiv").is_some());
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_guarded_market_data_deadline() {
        let (_, registry) = registry();
        let feed = GuardedMarketData::new(
            MockMarketData::new()
                .with_quote("EURUSD", 1.0, 1.1)
                .with_latency(Duration::from_secs(5)),
            registry,
            CircuitConfig::new().with_failure_threshold(1),
        )
        .unwrap()
        .with_deadline(Duration::from_millis(10));

        let err = feed.quote("EURUSD").await.unwrap_err();
        assert_eq!(err.status_code(), 504);
        assert_eq!(feed.circuit().state, CircuitStatus::Open);
    }

    #[test]
    fn test_guarded_broker_config() {
        let (_, registry) = registry();
        let store = GuardedBrokerConfig::new(
            MockBrokerConfig::new().with_broker(BrokerConfig::new("ib", 1.5, 0.35)),
            registry,
            CircuitConfig::new().with_failure_threshold(1),
        )
        .unwrap();

        assert_eq!(store.broker_config("ib").unwrap().commission_bps, 1.5);

        store.inner().set_failing(true);
        assert!(store.broker_config("ib").is_err());
        assert_eq!(store.circuit().state, CircuitStatus::Open);

        let err = store.broker_config("ib").unwrap_err();
        assert!(matches!(err, ProviderError::Unavailable(_)));
        assert_eq!(store.inner().call_count(), 2);
    }
}
