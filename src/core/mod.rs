//! Core types for the quoteguard library.
//!
//! - [`types`] - Circuit states, transitions and snapshots
//! - [`error`] - Structured error types
//! - [`clock`] - Time sources used to evaluate open timeouts

pub mod clock;
pub mod error;
pub mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{ConfigError, GuardError, GuardResult, ProviderError, ServiceUnavailable};
pub use types::{CircuitSnapshot, CircuitStatus, Transition};
