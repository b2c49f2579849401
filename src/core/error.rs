//! Error types for the quoteguard library.
//!
//! The guards keep two failure classes apart: the dependency itself failed
//! ([`GuardError::Dependency`]), or the circuit declined to call it
//! ([`GuardError::Unavailable`]). The library never panics; all errors are
//! returned as `Result` values.

use crate::core::types::CircuitStatus;

use std::time::Duration;
use thiserror::Error;

/// Returned when a circuit rejects a call and no fallback is configured.
///
/// This carries no information about the request itself. Callers should treat
/// it as retryable later.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("service '{service_id}' is unavailable: circuit is {state}")]
pub struct ServiceUnavailable {
    /// The service whose circuit rejected the call.
    pub service_id: String,
    /// State of the circuit at the time of rejection.
    pub state: CircuitStatus,
    /// How long until the circuit admits a probe, if known.
    pub retry_after: Option<Duration>,
}

impl ServiceUnavailable {
    /// Creates a new rejection error.
    pub fn new(service_id: impl Into<String>, state: CircuitStatus) -> Self {
        Self {
            service_id: service_id.into(),
            state,
            retry_after: None,
        }
    }

    /// Sets the retry hint.
    pub fn with_retry_after(mut self, retry_after: Option<Duration>) -> Self {
        self.retry_after = retry_after;
        self
    }
}

/// The error returned by a guarded call.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The circuit declined to invoke the operation.
    #[error(transparent)]
    Unavailable(#[from] ServiceUnavailable),

    /// The operation was started but did not finish within its deadline.
    #[error("call to service '{service_id}' timed out after {elapsed:?}")]
    TimedOut {
        /// The guarded service.
        service_id: String,
        /// The deadline that was exceeded.
        elapsed: Duration,
    },

    /// The operation itself failed. The original error is kept as is.
    #[error(transparent)]
    Dependency(E),
}

impl<E> GuardError<E> {
    /// Returns `true` if the call was rejected by the circuit.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns `true` if the error says nothing about the request itself and
    /// the call can be retried later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_) | Self::TimedOut { .. })
    }

    /// Returns the guarded service, unless the dependency itself failed.
    pub fn service_id(&self) -> Option<&str> {
        match self {
            Self::Unavailable(u) => Some(&u.service_id),
            Self::TimedOut { service_id, .. } => Some(service_id),
            Self::Dependency(_) => None,
        }
    }

    /// Returns the dependency error, if the operation itself failed.
    pub fn dependency(&self) -> Option<&E> {
        match self {
            Self::Dependency(e) => Some(e),
            _ => None,
        }
    }

    /// Consumes the error, returning the dependency error if there was one.
    pub fn into_dependency(self) -> Option<E> {
        match self {
            Self::Dependency(e) => Some(e),
            _ => None,
        }
    }

    /// Returns the rejection details, if the circuit rejected the call.
    pub fn unavailable(&self) -> Option<&ServiceUnavailable> {
        match self {
            Self::Unavailable(u) => Some(u),
            _ => None,
        }
    }

    /// Maps the dependency error, leaving guard errors untouched.
    pub fn map_dependency<U, M>(self, f: M) -> GuardError<U>
    where
        M: FnOnce(E) -> U,
    {
        match self {
            Self::Unavailable(u) => GuardError::Unavailable(u),
            Self::TimedOut {
                service_id,
                elapsed,
            } => GuardError::TimedOut {
                service_id,
                elapsed,
            },
            Self::Dependency(e) => GuardError::Dependency(f(e)),
        }
    }
}

/// Configuration error, raised at guard construction or settings load.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Name of the offending field.
        field: &'static str,
        /// Why it was rejected.
        reason: String,
    },

    /// The settings file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The settings file is not valid TOML for this schema.
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    /// Creates an `Invalid` error.
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by market data and broker configuration providers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// The upstream provider could not be reached or returned garbage.
    #[error("provider '{provider}' failed: {reason}")]
    Upstream {
        /// Name of the provider.
        provider: String,
        /// Human-readable reason.
        reason: String,
    },

    /// The provider answered, but had nothing for the key.
    #[error("no data for '{key}' from provider '{provider}'")]
    NotFound {
        /// Name of the provider.
        provider: String,
        /// The symbol or broker id that was looked up.
        key: String,
    },

    /// The provider took too long.
    #[error("provider '{provider}' timed out after {elapsed:?}")]
    Timeout {
        /// Name of the provider.
        provider: String,
        /// The deadline that was exceeded.
        elapsed: Duration,
    },

    /// The circuit for this provider is protecting the system.
    #[error(transparent)]
    Unavailable(#[from] ServiceUnavailable),
}

impl ProviderError {
    /// Creates an `Upstream` error.
    pub fn upstream(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Upstream {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Creates a `NotFound` error.
    pub fn not_found(provider: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            provider: provider.into(),
            key: key.into(),
        }
    }

    /// Returns the HTTP status an endpoint should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Upstream { .. } => 502,
            Self::NotFound { .. } => 404,
            Self::Timeout { .. } => 504,
            Self::Unavailable(_) => 503,
        }
    }

    /// Returns `true` if the request may succeed when retried later.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::NotFound { .. })
    }
}

impl From<GuardError<ProviderError>> for ProviderError {
    fn from(err: GuardError<ProviderError>) -> Self {
        match err {
            GuardError::Unavailable(u) => Self::Unavailable(u),
            GuardError::TimedOut {
                service_id,
                elapsed,
            } => Self::Timeout {
                provider: service_id,
                elapsed,
            },
            GuardError::Dependency(e) => e,
        }
    }
}

/// A specialized `Result` type for guarded calls.
pub type GuardResult<T, E> = Result<T, GuardError<E>>;
