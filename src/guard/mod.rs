//! Guards: circuit breakers wrapped around calls.
//!
//! A guard binds a service id, its thresholds and an optional fallback to a
//! shared [`CircuitRegistry`](crate::circuit_breaker::CircuitRegistry). It
//! decides whether a call is attempted, and records the outcome if it is.
//! Retries are left to the caller.
//!
//! - [`SyncGuard`] - blocking closures
//! - [`AsyncGuard`] - futures
//! - [`GuardBuilder`] - builds either from the registry's baseline config

mod async_guard;
mod builder;
mod permit;
mod sync_guard;

pub use async_guard::{AsyncGuard, GuardedFn};
pub use builder::GuardBuilder;
pub use sync_guard::SyncGuard;
