//! Simulation configuration.
//!
//! Every knob has a default matching the reference demo network, so
//! `SimulationConfig::default()` is always valid. Hosts that load
//! configuration from JSON must call [`SimulationConfig::validate`] (which
//! [`SimulationConfig::from_json_str`] does for them).

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Bounds for the cascade delay estimator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CascadeConfig {
    /// Lower bound (inclusive) of the delay multiplier draw.
    pub min_multiplier: f64,
    /// Upper bound (exclusive) of the delay multiplier draw.
    pub max_multiplier: f64,
    /// Secondary delays at or below this many minutes are ignored.
    pub min_additional_delay: u32,
    /// Seed for the default random source.
    pub seed: u64,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            min_multiplier: 0.3,
            max_multiplier: 0.7,
            min_additional_delay: 5,
            seed: 42,
        }
    }
}

impl CascadeConfig {
    /// Validate the multiplier range.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.min_multiplier.is_finite() || !self.max_multiplier.is_finite() {
            return Err(ValidationError::InvalidConfig {
                reason: "cascade multipliers must be finite".to_string(),
            });
        }
        if self.min_multiplier < 0.0 {
            return Err(ValidationError::InvalidConfig {
                reason: "cascade.min_multiplier must be >= 0".to_string(),
            });
        }
        if self.min_multiplier >= self.max_multiplier {
            return Err(ValidationError::InvalidConfig {
                reason: format!(
                    "cascade multiplier range [{}, {}) is empty",
                    self.min_multiplier, self.max_multiplier
                ),
            });
        }
        Ok(())
    }
}

/// Thresholds that trigger dispatch recommendations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationThresholds {
    /// Network impact above this many minutes triggers a reroute.
    pub total_impact_minutes: u32,
    /// More affected trains than this triggers a buffer hold.
    pub affected_count: usize,
}

impl Default for RecommendationThresholds {
    fn default() -> Self {
        Self {
            total_impact_minutes: 60,
            affected_count: 3,
        }
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Clock value at construction and after every reset.
    pub start_time: DateTime<Utc>,
    /// Minutes advanced by `advance_and_snapshot`.
    pub auto_step_minutes: u32,
    /// Cascade estimator settings.
    pub cascade: CascadeConfig,
    /// Recommendation thresholds.
    pub thresholds: RecommendationThresholds,
    /// Per-subscriber event queue capacity.
    pub event_capacity: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_time: default_start_time(),
            auto_step_minutes: 5,
            cascade: CascadeConfig::default(),
            thresholds: RecommendationThresholds::default(),
            event_capacity: 256,
        }
    }
}

fn default_start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 10, 27, 8, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

impl SimulationConfig {
    /// Validate configuration.
    ///
    /// This must be called before constructing a `SimulationContext`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.auto_step_minutes == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "auto_step_minutes must be > 0".to_string(),
            });
        }
        if self.event_capacity == 0 {
            return Err(ValidationError::InvalidConfig {
                reason: "event_capacity must be > 0".to_string(),
            });
        }
        self.cascade.validate()
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ValidationError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_default_is_valid() {
        SimulationConfig::default().validate().unwrap();
    }

    #[test]
    fn default_start_time_is_demo_morning() {
        let config = SimulationConfig::default();
        assert_eq!(config.start_time.to_rfc3339(), "2023-10-27T08:00:00+00:00");
    }

    #[test]
    fn config_rejects_zero_limits() {
        let mut c = SimulationConfig::default();
        c.auto_step_minutes = 0;
        assert!(c.validate().is_err());

        let mut c = SimulationConfig::default();
        c.event_capacity = 0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn config_rejects_empty_multiplier_range() {
        let mut c = SimulationConfig::default();
        c.cascade.min_multiplier = 0.7;
        c.cascade.max_multiplier = 0.7;
        assert!(c.validate().is_err());

        let mut c = SimulationConfig::default();
        c.cascade.max_multiplier = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn from_json_fills_defaults() {
        let config = SimulationConfig::from_json_str(
            r#"{"auto_step_minutes": 10, "cascade": {"seed": 7}}"#,
        )
        .unwrap();
        assert_eq!(config.auto_step_minutes, 10);
        assert_eq!(config.cascade.seed, 7);
        assert!((config.cascade.min_multiplier - 0.3).abs() < f64::EPSILON);
        assert_eq!(config.thresholds, RecommendationThresholds::default());
    }

    #[test]
    fn from_json_rejects_garbage_and_invalid_values() {
        assert!(SimulationConfig::from_json_str("not json").is_err());
        assert!(SimulationConfig::from_json_str(r#"{"event_capacity": 0}"#).is_err());
    }
}
