//! Circuit settings loaded from TOML.
//!
//! ```toml
//! [defaults]
//! failure_threshold = 5
//! timeout_seconds = 60
//!
//! [services.market_data]
//! failure_threshold = 3
//! timeout_seconds = 5
//! success_threshold = 2
//! ```
//!
//! Fields missing from a `[services.*]` table take the crate defaults, not the
//! values in `[defaults]`.

use crate::circuit_breaker::config::CircuitConfig;
use crate::core::ConfigError;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Baseline circuit configuration for a process.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BreakerSettings {
    /// Configuration for services without an override.
    pub defaults: CircuitConfig,

    /// Per-service overrides, keyed by service id.
    pub services: HashMap<String, CircuitConfig>,
}

impl BreakerSettings {
    /// Creates settings with crate defaults and no overrides.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the default configuration.
    pub fn with_defaults(mut self, defaults: CircuitConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Adds an override for one service.
    pub fn with_service(mut self, service_id: impl Into<String>, config: CircuitConfig) -> Self {
        self.services.insert(service_id.into(), config);
        self
    }

    /// Parses and validates settings from a TOML string.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reads, parses and validates a TOML settings file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&content)?;
        tracing::info!(
            path = %path.display(),
            overrides = settings.services.len(),
            "Loaded circuit breaker settings"
        );
        Ok(settings)
    }

    /// Validates the defaults and every override.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.defaults.validate()?;
        for config in self.services.values() {
            config.validate()?;
        }
        Ok(())
    }

    /// Returns the configuration for `service_id`.
    pub fn config_for(&self, service_id: &str) -> CircuitConfig {
        self.services
            .get(service_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }
}
