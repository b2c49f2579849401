//! Circuit breaker state, configuration and registry.
//!
//! The circuit breaker pattern prevents cascading failures by temporarily
//! stopping traffic to failing dependencies and periodically probing them to
//! detect recovery.
//!
//! ## States
//!
//! - **Closed**: Normal operation; calls pass through and failures are counted.
//! - **Open**: The dependency is failing; calls are rejected immediately.
//! - **Half-Open**: A single probe call at a time tests whether the dependency
//!   has recovered.
//!
//! ## Usage
//!
//! ```rust
//! use quoteguard::circuit_breaker::{CircuitConfig, CircuitRegistry};
//! use std::time::Duration;
//!
//! let registry = CircuitRegistry::new();
//! let config = CircuitConfig::default()
//!     .with_failure_threshold(3)
//!     .with_timeout(Duration::from_secs(5));
//!
//! let circuit = registry.register("market_data", &config);
//! assert_eq!(circuit.snapshot().config.failure_threshold, 3);
//! ```

mod config;
mod registry;
mod settings;
mod state;

pub use config::CircuitConfig;
pub use registry::{Circuit, CircuitRegistry};
pub use settings::BreakerSettings;
pub use state::{Admission, BreakerMetrics, CircuitState, Ticket};
