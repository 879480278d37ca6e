//! Runtime configuration.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::semaphore::UnderflowPolicy;

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SemaphoreConfig {
    /// Per-stream buffer capacity for `NotificationStream` consumers.
    pub stream_capacity: usize,
    /// How surplus unlocks are accounted.
    pub underflow: UnderflowPolicy,
}

impl Default for SemaphoreConfig {
    fn default() -> Self {
        Self {
            stream_capacity: 1024,
            underflow: UnderflowPolicy::Carry,
        }
    }
}

impl SemaphoreConfig {
    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(input: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values no consumer can work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "stream_capacity".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SemaphoreConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.stream_capacity, 1024);
        assert_eq!(cfg.underflow, UnderflowPolicy::Carry);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg = SemaphoreConfig::from_json(r#"{ "underflow": "saturate" }"#).unwrap();
        assert_eq!(cfg.underflow, UnderflowPolicy::Saturate);
        assert_eq!(cfg.stream_capacity, 1024);
    }

    #[test]
    fn zero_capacity_rejected() {
        let err = SemaphoreConfig::from_json(r#"{ "stream_capacity": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity { .. }));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = SemaphoreConfig::from_json(r#"{ "capacity": 8 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
