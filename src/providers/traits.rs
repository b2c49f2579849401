//! Provider traits and the data they return.

use crate::core::ProviderError;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// A bid/ask quote for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// Instrument symbol, e.g. "EURUSD".
    pub symbol: String,
    /// Best bid.
    pub bid: f64,
    /// Best ask.
    pub ask: f64,
    /// When the provider produced the quote.
    pub timestamp: DateTime<Utc>,
}

impl Quote {
    /// Creates a quote stamped with the current time.
    pub fn new(symbol: impl Into<String>, bid: f64, ask: f64) -> Self {
        Self {
            symbol: symbol.into(),
            bid,
            ask,
            timestamp: Utc::now(),
        }
    }

    /// Returns the mid price.
    pub fn mid(&self) -> f64 {
        (self.bid + self.ask) / 2.0
    }
}

/// Fee parameters for one broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Broker identifier.
    pub broker_id: String,
    /// Commission in basis points of notional.
    pub commission_bps: f64,
    /// Minimum fee per trade.
    pub min_fee: f64,
}

impl BrokerConfig {
    /// Creates a broker configuration.
    pub fn new(broker_id: impl Into<String>, commission_bps: f64, min_fee: f64) -> Self {
        Self {
            broker_id: broker_id.into(),
            commission_bps,
            min_fee,
        }
    }
}

/// A source of live market data.
///
/// # Example Implementation
///
/// ```rust,ignore
/// use quoteguard::providers::{MarketDataProvider, Quote};
/// use quoteguard::ProviderError;
/// use async_trait::async_trait;
///
/// #[derive(Debug)]
/// struct FeedClient;
///
/// #[async_trait]
/// impl MarketDataProvider for FeedClient {
///     fn name(&self) -> &str {
///         "feed"
///     }
///
///     async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError> {
///         // Fetch from the feed...
///         todo!()
///     }
/// }
/// ```
#[async_trait]
pub trait MarketDataProvider: Send + Sync + Debug {
    /// Returns a stable name for this provider.
    fn name(&self) -> &str;

    /// Fetches the latest quote for `symbol`.
    async fn quote(&self, symbol: &str) -> Result<Quote, ProviderError>;
}

/// A blocking lookup of broker fee parameters.
pub trait BrokerConfigProvider: Send + Sync + Debug {
    /// Returns a stable name for this provider.
    fn name(&self) -> &str;

    /// Looks up the configuration for `broker_id`.
    fn broker_config(&self, broker_id: &str) -> Result<BrokerConfig, ProviderError>;
}
