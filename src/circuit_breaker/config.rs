//! Circuit breaker configuration.

use crate::core::ConfigError;

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Thresholds governing one circuit.
///
/// In TOML or JSON the timeout is written as fractional seconds under
/// `timeout_seconds`:
///
/// ```toml
/// failure_threshold = 3
/// success_threshold = 2
/// timeout_seconds = 2.5
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitConfig {
    /// Number of consecutive failures before opening the circuit.
    pub failure_threshold: u32,

    /// Number of consecutive half-open successes needed to close the circuit.
    pub success_threshold: u32,

    /// How long to keep the circuit open before admitting a probe.
    #[serde(rename = "timeout_seconds", with = "duration_secs")]
    pub timeout: Duration,
}

impl Default for CircuitConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            timeout: Duration::from_secs(60),
        }
    }
}

impl CircuitConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the failure threshold.
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    /// Sets the success threshold.
    pub fn with_success_threshold(mut self, threshold: u32) -> Self {
        self.success_threshold = threshold;
        self
    }

    /// Sets the open timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the open timeout from fractional seconds.
    ///
    /// Fails for negative, NaN or overflowing values.
    pub fn with_timeout_secs(self, secs: f64) -> Result<Self, ConfigError> {
        let timeout = Duration::try_from_secs_f64(secs)
            .map_err(|e| ConfigError::invalid("timeout_seconds", format!("{secs}: {e}")))?;
        Ok(self.with_timeout(timeout))
    }

    /// Checks that both thresholds are at least one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::invalid(
                "failure_threshold",
                "must be at least 1",
            ));
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::invalid(
                "success_threshold",
                "must be at least 1",
            ));
        }
        Ok(())
    }

    /// A configuration that trips early and stays open longer.
    ///
    /// - Opens after 3 failures
    /// - Stays open for 120 seconds
    /// - Needs 3 successful probes to close
    pub fn strict() -> Self {
        Self {
            failure_threshold: 3,
            success_threshold: 3,
            timeout: Duration::from_secs(120),
        }
    }

    /// A configuration that tolerates more failures and recovers quickly.
    ///
    /// - Opens after 10 failures
    /// - Stays open for 10 seconds
    /// - Closes on the first successful probe
    pub fn high_availability() -> Self {
        Self {
            failure_threshold: 10,
            success_threshold: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Serde adapter writing a `Duration` as fractional seconds.
mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CircuitConfig::default();
        assert_eq!(config.failure_threshold, 5);
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = CircuitConfig::new()
            .with_failure_threshold(3)
            .with_success_threshold(2)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.success_threshold, 2);
        assert_eq!(config.timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_zero_thresholds_rejected() {
        let err = CircuitConfig::new().with_failure_threshold(0).validate();
        assert!(matches!(
            err,
            Err(ConfigError::Invalid {
                field: "failure_threshold",
                ..
            })
        ));

        let err = CircuitConfig::new().with_success_threshold(0).validate();
        assert!(matches!(
            err,
            Err(ConfigError::Invalid {
                field: "success_threshold",
                ..
            })
        ));
    }

    #[test]
    fn test_timeout_secs() {
        let config = CircuitConfig::new().with_timeout_secs(0.25).unwrap();
        assert_eq!(config.timeout, Duration::from_millis(250));

        let zero = CircuitConfig::new().with_timeout_secs(0.0).unwrap();
        assert_eq!(zero.timeout, Duration::ZERO);

        assert!(CircuitConfig::new().with_timeout_secs(-1.0).is_err());
        assert!(CircuitConfig::new().with_timeout_secs(f64::NAN).is_err());
    }

    #[test]
    fn test_serde_uses_timeout_seconds() {
        let config: CircuitConfig =
            serde_json::from_str(r#"{"failure_threshold": 3, "timeout_seconds": 1.5}"#).unwrap();
        assert_eq!(config.failure_threshold, 3);
        assert_eq!(config.success_threshold, 1);
        assert_eq!(config.timeout, Duration::from_millis(1500));

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["timeout_seconds"], 1.5);

        let negative = serde_json::from_str::<CircuitConfig>(r#"{"timeout_seconds": -2}"#);
        assert!(negative.is_err());
    }
}
