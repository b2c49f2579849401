//! External data providers and their guarded wrappers.
//!
//! - [`MarketDataProvider`] - async live quotes
//! - [`BrokerConfigProvider`] - blocking broker fee lookups
//! - [`GuardedMarketData`] / [`GuardedBrokerConfig`] - the same traits,
//!   behind a circuit breaker
//! - [`MockMarketData`] / [`MockBrokerConfig`] - switchable test doubles

mod guarded;
mod mock;
mod traits;

pub use guarded::{GuardedBrokerConfig, GuardedMarketData};
pub use mock::{MockBrokerConfig, MockMarketData};
pub use traits::{BrokerConfig, BrokerConfigProvider, MarketDataProvider, Quote};
