//! Dispatch recommendations.
//!
//! Independent threshold rules evaluated in a fixed order. Every rule that
//! fires contributes one recommendation; if none fires the engine returns a
//! single low-priority "keep monitoring" entry.

use serde::{Deserialize, Serialize};

use crate::cascade::CascadeImpact;
use crate::config::RecommendationThresholds;
use crate::predictor::RiskLevel;

/// Urgency of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Priority {
    /// Act immediately.
    Critical,
    /// Act soon.
    High,
    /// Worth doing.
    Medium,
    /// Informational.
    Low,
}

/// One advisory action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Stable rule id (e.g. `REC-HIGH-01`).
    pub id: String,
    /// Urgency.
    pub priority: Priority,
    /// What to do.
    pub action: String,
    /// Expected benefit.
    pub impact_reduction: String,
    /// Static per-rule confidence.
    pub confidence: f32,
}

/// Maps cascade impact and risk to recommendations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecommendationEngine {
    thresholds: RecommendationThresholds,
}

impl RecommendationEngine {
    /// Creates an engine with the given thresholds.
    #[must_use]
    pub const fn new(thresholds: RecommendationThresholds) -> Self {
        Self { thresholds }
    }

    /// Active thresholds.
    #[must_use]
    pub const fn thresholds(&self) -> RecommendationThresholds {
        self.thresholds
    }

    /// Returns every recommendation whose rule fires, in rule order:
    /// critical risk, network impact, affected-train count, then the
    /// monitoring fallback when nothing else applies.
    #[must_use]
    pub fn generate(&self, impact: &CascadeImpact, risk: RiskLevel) -> Vec<Recommendation> {
        let mut recs = Vec::new();

        if risk == RiskLevel::High {
            recs.push(Recommendation {
                id: "REC-CRIT-01".to_string(),
                priority: Priority::Critical,
                action: format!(
                    "Critical delay risk for {}: reroute express trains away from the affected corridor.",
                    impact.primary_id
                ),
                impact_reduction: "Keeps express services clear of the disruption.".to_string(),
                confidence: 0.90,
            });
        }

        if impact.total_impact_minutes > self.thresholds.total_impact_minutes {
            recs.push(Recommendation {
                id: "REC-HIGH-01".to_string(),
                priority: Priority::High,
                action: format!(
                    "Reroute a low-priority freight train to free up track for {}.",
                    impact.primary_id
                ),
                impact_reduction: format!(
                    "~{} minutes saved network-wide",
                    u64::from(impact.total_impact_minutes) * 2 / 5
                ),
                confidence: 0.85,
            });
        }

        if impact.affected_count > self.thresholds.affected_count {
            recs.push(Recommendation {
                id: "REC-MED-01".to_string(),
                priority: Priority::Medium,
                action: "Hold an express train at the next major station for 15 mins to create a safe buffer."
                    .to_string(),
                impact_reduction: format!(
                    "Prevents cascading delays for {} other trains.",
                    impact.affected_count.saturating_sub(1)
                ),
                confidence: 0.72,
            });
        }

        if recs.is_empty() {
            recs.push(Recommendation {
                id: "REC-LOW-01".to_string(),
                priority: Priority::Low,
                action: "Monitor network. Current predicted impact is within acceptable parameters."
                    .to_string(),
                impact_reduction: "N/A".to_string(),
                confidence: 0.95,
            });
        }

        recs
    }
}
