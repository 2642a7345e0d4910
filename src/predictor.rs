//! Delay predictor boundary.
//!
//! The production delay model is an external ensemble regressor. The core
//! only talks to it through [`DelayPredictor`]: it sends a structured
//! [`FeatureRecord`] and reads back a [`Prediction`], of which it consumes
//! only the [`RiskLevel`]. Everything else is surfaced to callers as-is.
//!
//! [`HeuristicPredictor`] is a deterministic stand-in built from the same
//! risk and explanation rules the ensemble applies on top of its regression.
//! It is useful for demos and tests; it makes no accuracy claims.

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{RailResult, ValidationError};

/// Hours treated as peak traffic.
pub const PEAK_HOURS: [u32; 6] = [7, 8, 9, 17, 18, 19];

/// Severity classification accompanying a predicted delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    /// Under 10 minutes expected.
    Low,
    /// Between 10 and 30 minutes expected.
    Medium,
    /// Over 30 minutes expected.
    High,
}

impl RiskLevel {
    /// Classifies a predicted delay.
    #[must_use]
    pub fn from_predicted_delay(minutes: f64) -> Self {
        if minutes > 30.0 {
            Self::High
        } else if minutes > 10.0 {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

/// Inputs sent to the delay predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureRecord {
    /// Hour of day, 0-23.
    pub hour: u32,
    /// Day of week, Monday = 0.
    pub day_of_week: u32,
    /// Train priority class; lower is more important.
    pub priority: u8,
    /// Delay already accumulated, in minutes.
    pub current_delay: u32,
    /// Weather severity, 0 (clear) upwards.
    pub weather_severity: f64,
    /// Network congestion ratio in `[0, 1]`.
    pub congestion: f64,
}

impl Default for FeatureRecord {
    fn default() -> Self {
        Self {
            hour: 0,
            day_of_week: 0,
            priority: 2,
            current_delay: 0,
            weather_severity: 0.0,
            congestion: 0.5,
        }
    }
}

impl FeatureRecord {
    /// Features for a train with `current_delay` minutes of delay at simulated time `now`.
    #[must_use]
    pub fn at(now: DateTime<Utc>, current_delay: u32) -> Self {
        Self {
            hour: now.hour(),
            day_of_week: now.weekday().num_days_from_monday(),
            current_delay,
            ..Self::default()
        }
    }

    /// Sets the weather severity.
    #[must_use]
    pub fn with_weather_severity(mut self, severity: f64) -> Self {
        self.weather_severity = severity;
        self
    }

    /// Sets the congestion ratio.
    #[must_use]
    pub fn with_congestion(mut self, congestion: f64) -> Self {
        self.congestion = congestion;
        self
    }

    /// Sets the priority class.
    #[must_use]
    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    /// Returns true during morning or evening peak.
    #[must_use]
    pub fn is_peak_hour(&self) -> bool {
        PEAK_HOURS.contains(&self.hour)
    }

    /// Returns true on Saturday or Sunday.
    #[must_use]
    pub const fn is_weekend(&self) -> bool {
        self.day_of_week >= 5
    }
}

/// Predictor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Expected delay in minutes, never negative.
    pub predicted_delay_minutes: f64,
    /// Confidence in `[0, 1]`.
    pub confidence_score: f32,
    /// Severity bucket.
    pub risk_level: RiskLevel,
    /// Human-readable contributing factors.
    pub explanation: Vec<String>,
}

impl Prediction {
    /// Builds a prediction, clamping negative delays to zero and deriving the risk level.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::ConfidenceOutOfRange` if the confidence is
    /// outside `[0, 1]` or not finite.
    pub fn new(
        predicted_delay_minutes: f64,
        confidence_score: f32,
        explanation: Vec<String>,
    ) -> Result<Self, ValidationError> {
        if !confidence_score.is_finite() || !(0.0..=1.0).contains(&confidence_score) {
            return Err(ValidationError::ConfidenceOutOfRange {
                value: confidence_score,
            });
        }
        let predicted_delay_minutes = if predicted_delay_minutes.is_finite() {
            predicted_delay_minutes.max(0.0)
        } else {
            0.0
        };
        Ok(Self {
            predicted_delay_minutes,
            confidence_score,
            risk_level: RiskLevel::from_predicted_delay(predicted_delay_minutes),
            explanation,
        })
    }
}

impl Prediction {
    /// Predicted delay rounded to whole minutes.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn whole_minutes(&self) -> u32 {
        let rounded = self.predicted_delay_minutes.round();
        if rounded >= f64::from(u32::MAX) {
            u32::MAX
        } else {
            rounded.max(0.0) as u32
        }
    }
}

/// External delay prediction model.
pub trait DelayPredictor: Send + Sync {
    /// Predicts the delay for the given features.
    ///
    /// Calls are synchronous; retry and timeout policy belong to the caller.
    fn predict(&self, features: &FeatureRecord) -> RailResult<Prediction>;
}

/// Lists the factors that explain a delay outlook.
#[must_use]
pub fn explain(features: &FeatureRecord) -> Vec<String> {
    let mut lines = Vec::new();
    if features.current_delay > 15 {
        lines.push(format!(
            "High initial delay ({} min) is a major factor.",
            features.current_delay
        ));
    }
    if features.weather_severity > 5.0 {
        lines.push("Severe weather conditions are worsening the outlook.".to_string());
    }
    if features.is_peak_hour() {
        lines.push("Peak hour traffic is contributing to congestion.".to_string());
    }
    if features.congestion > 0.7 {
        lines.push("High overall network congestion is amplifying delays.".to_string());
    }
    if lines.is_empty() {
        lines.push("Prediction based on standard operational patterns.".to_string());
    }
    lines
}

/// Rule-based stand-in for the ensemble model.
///
/// The estimate starts from the current delay and adds a penalty for each
/// aggravating factor that [`explain`] reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicPredictor {
    /// Minutes added per unit of weather severity.
    pub weather_minutes: f64,
    /// Minutes added during peak hours.
    pub peak_minutes: f64,
    /// Minutes added at full congestion (scaled linearly).
    pub congestion_minutes: f64,
    /// Confidence reported with every prediction.
    pub confidence: f32,
}

impl Default for HeuristicPredictor {
    fn default() -> Self {
        Self {
            weather_minutes: 2.0,
            peak_minutes: 5.0,
            congestion_minutes: 10.0,
            confidence: 0.5,
        }
    }
}

impl DelayPredictor for HeuristicPredictor {
    fn predict(&self, features: &FeatureRecord) -> RailResult<Prediction> {
        let mut minutes = f64::from(features.current_delay)
            + features.weather_severity.max(0.0) * self.weather_minutes
            + features.congestion.clamp(0.0, 1.0) * self.congestion_minutes;
        if features.is_peak_hour() {
            minutes += self.peak_minutes;
        }
        let rounded = (minutes * 100.0).round() / 100.0;
        Ok(Prediction::new(rounded, self.confidence, explain(features))?)
    }
}
