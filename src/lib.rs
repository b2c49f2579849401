//! # Quoteguard
//!
//! Per-service circuit breakers for the external dependencies of a trading
//! backend: live market data feeds, broker configuration stores and anything
//! else that can go down.
//!
//! ## Overview
//!
//! Each external service gets its own circuit, tracked in a shared
//! [`CircuitRegistry`]. A guard wraps calls to the service:
//!
//! - While the circuit is **closed**, calls pass through and consecutive
//!   failures are counted.
//! - After `failure_threshold` consecutive failures the circuit **opens** and
//!   calls are rejected immediately, with the guard's fallback value if it
//!   has one.
//! - Once `timeout` has elapsed the next call is let through as a single
//!   **half-open** probe. `success_threshold` successful probes close the
//!   circuit again; a failed probe reopens it.
//!
//! Operators can inspect and reset circuits through [`CircuitAdmin`].
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use quoteguard::prelude::*;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = Arc::new(CircuitRegistry::new());
//!
//!     let guard: AsyncGuard<f64> = AsyncGuard::builder(&registry, "market_data")
//!         .failure_threshold(3)
//!         .timeout(Duration::from_secs(30))
//!         .build_async()?;
//!
//!     match guard.call(|| fetch_mid_price("EURUSD")).await {
//!         Ok(price) => println!("EURUSD {price}"),
//!         Err(GuardError::Unavailable(e)) => println!("feed resting: {e}"),
//!         Err(e) => println!("feed error: {e}"),
//!     }
//!
//!     let admin = CircuitAdmin::new(registry);
//!     println!("{}", admin.states_json());
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `default` - Includes tokio runtime support
//! - `tokio-runtime` - Call deadlines and simulated provider latency via tokio
//!
//! ## Architecture
//!
//! - **Core**: States, snapshots, clocks and error types
//! - **Circuit Breaker**: Per-service state machine, configuration and registry
//! - **Guard**: Sync and async wrappers that route calls through a circuit
//! - **Admin**: Operator view and reset
//! - **Providers**: Market data and broker config traits with guarded wrappers
//! - **Audit**: Structured logging of transitions, rejections and resets

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod admin;
pub mod audit;
pub mod circuit_breaker;
pub mod core;
pub mod guard;
pub mod providers;

// Re-export commonly used types at the crate root
pub use crate::core::{
    CircuitSnapshot, CircuitStatus, Clock, ConfigError, GuardError, GuardResult, ManualClock,
    ProviderError, ServiceUnavailable, SystemClock,
};

pub use crate::admin::{CircuitAdmin, StateSummary};
pub use crate::circuit_breaker::{BreakerMetrics, BreakerSettings, CircuitConfig, CircuitRegistry};
pub use crate::guard::{AsyncGuard, GuardBuilder, SyncGuard};

/// Prelude module for convenient imports.
///
/// ```rust
/// use quoteguard::prelude::*;
/// ```
pub mod prelude {
    pub use crate::admin::CircuitAdmin;
    pub use crate::circuit_breaker::{BreakerSettings, CircuitConfig, CircuitRegistry};
    pub use crate::core::{
        CircuitSnapshot, CircuitStatus, GuardError, ProviderError, ServiceUnavailable,
    };
    pub use crate::guard::{AsyncGuard, SyncGuard};
    pub use crate::providers::{
        BrokerConfig, BrokerConfigProvider, GuardedBrokerConfig, GuardedMarketData,
        MarketDataProvider, Quote,
    };
}
