//! Mock providers for testing.
//!
//! Both mocks count their calls and can be switched between healthy and
//! failing at runtime, which is what circuit tests need.

use crate::core::ProviderError;
use crate::providers::traits::{BrokerConfig, BrokerConfigProvider, MarketDataProvider, Quote};

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;
#[cfg(feature = "tokio-runtime")]
use std::time::Duration;

/// A mock market data feed.
///
/// # Examples
///
/// ```rust
/// use quoteguard::providers::MockMarketData;
///
/// let feed = MockMarketData::new().with_quote("EURUSD", 1.0840, 1.0844);
/// feed.set_failing(true);
/// assert!(feed.is_failing());
/// ```
#[derive(Debug)]
pub struct MockMarketData {
    name: String,
    quotes: RwLock<HashMap<String, (f64, f64)>>,
    failing: AtomicBool,
    call_count: AtomicU64,
    #[cfg(feature = "tokio-runtime")]
    latency: Option<Duration>,
}

impl MockMarketData {
    /// Creates a healthy feed with no quotes.
    pub fn new() -> Self {
        Self {
            name: "mock-market-data".to_string(),
            quotes: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            call_count: AtomicU64::new(0),
            #[cfg(feature = "tokio-runtime")]
            latency: None,
        }
    }

    /// Sets the name of this feed.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Adds a quote.
    pub fn with_quote(self, symbol: impl Into<String>, bid: f64, ask: f64) -> Self {
        self.set_quote(symbol, bid, ask);
        self
    }

    /// Sets the simulated latency for each call.
    #[cfg(feature = "tokio-runtime")]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Adds or replaces a quote.
    pub fn set_quote(&self, symbol: impl Into<String>, bid: f64, ask: f64) {
        self.quotes
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(symbol.into(), (bid, ask));
    }

    /// Makes every call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns `true` if calls currently fail.
    pub fn is_failing(&self) -> bool {
        self.failing.load(Ordering::SeqCst)
    }

    /// Returns the number of calls that reached this feed.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockMarketData {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MarketDataProvider for MockMarketData {
    fn name(&self) -> &str {
        &self.name
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        #[cfg(feature = "tokio-runtime")]
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        if self.is_failing() {
            return Err(ProviderError::upstream(&self.name, "simulated outage"));
        }

        let (bid, ask) = self
            .quotes
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(symbol)
            .copied()
            .ok_or_else(|| ProviderError::not_found(&self.name, symbol))?;

        Ok(Quote::new(symbol, bid, ask))
    }
}

/// A mock broker configuration store.
#[derive(Debug)]
pub struct MockBrokerConfig {
    name: String,
    brokers: RwLock<HashMap<String, BrokerConfig>>,
    failing: AtomicBool,
    call_count: AtomicU64,
}

impl MockBrokerConfig {
    /// Creates a healthy store with no brokers.
    pub fn new() -> Self {
        Self {
            name: "mock-broker-config".to_string(),
            brokers: RwLock::new(HashMap::new()),
            failing: AtomicBool::new(false),
            call_count: AtomicU64::new(0),
        }
    }

    /// Adds a broker.
    pub fn with_broker(self, config: BrokerConfig) -> Self {
        self.brokers
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(config.broker_id.clone(), config);
        self
    }

    /// Makes every call fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Returns the number of calls that reached this store.
    pub fn call_count(&self) -> u64 {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl Default for MockBrokerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl BrokerConfigProvider for MockBrokerConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn broker_config(&self, broker_id: &str) -> Result<BrokerConfig, ProviderError> {
        self.call_count.fetch_add(1, Ordering::SeqCst);

        if self.failing.load(Ordering::SeqCst) {
            return Err(ProviderError::upstream(&self.name, "simulated outage"));
        }

        self.brokers
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(broker_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(&self.name, broker_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_market_data_quote() {
        let feed = MockMarketData::new().with_quote("EURUSD", 1.0840, 1.0844);

        let quote = feed.quote("EURUSD").await.unwrap();
        assert_eq!(quote.bid, 1.0840);
        assert_eq!(feed.call_count(), 1);

        let missing = feed.quote("GBPUSD").await.unwrap_err();
        assert_eq!(missing.status_code(), 404);
    }

    #[tokio::test]
    async fn test_mock_market_data_failing() {
        let feed = MockMarketData::new().with_quote("EURUSD", 1.0, 1.1);

        feed.set_failing(true);
        assert!(matches!(
            feed.quote("EURUSD").await,
            Err(ProviderError::Upstream { .. })
        ));

        feed.set_failing(false);
        assert!(feed.quote("EURUSD").await.is_ok());
        assert_eq!(feed.call_count(), 2);
    }

    #[test]
    fn test_mock_broker_config() {
        let store = MockBrokerConfig::new().with_broker(BrokerConfig::new("ib", 1.5, 0.35));

        assert_eq!(store.broker_config("ib").unwrap().min_fee, 0.35);
        assert!(store.broker_config("unknown").is_err());

        store.set_failing(true);
        assert!(matches!(
            store.broker_config("ib"),
            Err(ProviderError::Upstream { .. })
        ));
        assert_eq!(store.call_count(), 3);
    }
}
