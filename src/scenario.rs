//! Named disruption scenarios.
//!
//! A scenario is a fixed batch of delay events used to drive demos. Scenarios
//! go through the same [`Simulator::add_delay_event`] path as manual delays.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ValidationError;
use crate::simulator::{DelayOutcome, Simulator};
use crate::train::TrainId;

/// One delay within a scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenarioDelay {
    /// Target train.
    pub train_id: &'static str,
    /// Minutes to add.
    pub minutes: u32,
    /// Reported cause.
    pub cause: &'static str,
}

/// Built-in scenarios.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    /// One train breaks down.
    SingleBreakdown,
    /// Fog delays several trains at once.
    WeatherDisruption,
}

const SINGLE_BREAKDOWN: &[ScenarioDelay] = &[ScenarioDelay {
    train_id: "T-105",
    minutes: 25,
    cause: "Engine Failure",
}];

const WEATHER_DISRUPTION: &[ScenarioDelay] = &[
    ScenarioDelay {
        train_id: "T-102",
        minutes: 15,
        cause: "Weather",
    },
    ScenarioDelay {
        train_id: "T-110",
        minutes: 20,
        cause: "Weather",
    },
];

impl Scenario {
    /// Every built-in scenario.
    pub const ALL: [Self; 2] = [Self::SingleBreakdown, Self::WeatherDisruption];

    /// Wire name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::SingleBreakdown => "single_breakdown",
            Self::WeatherDisruption => "weather_disruption",
        }
    }

    /// Delays injected by this scenario.
    #[must_use]
    pub const fn delays(self) -> &'static [ScenarioDelay] {
        match self {
            Self::SingleBreakdown => SINGLE_BREAKDOWN,
            Self::WeatherDisruption => WEATHER_DISRUPTION,
        }
    }

    /// Operator-facing summary.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::SingleBreakdown => "Scenario injected: Train T-105 has broken down.",
            Self::WeatherDisruption => "Scenario injected: Foggy conditions causing multiple delays.",
        }
    }

    /// Applies every delay of this scenario to `sim`.
    ///
    /// Trains missing from the registry are reported as
    /// [`DelayOutcome::UnknownTrain`] and skipped.
    pub fn apply(self, sim: &mut Simulator) -> Result<ScenarioOutcome, ValidationError> {
        let mut applied = Vec::with_capacity(self.delays().len());
        for delay in self.delays() {
            let outcome = sim.add_delay_event(delay.train_id, delay.minutes, delay.cause)?;
            applied.push(AppliedDelay {
                train_id: TrainId::new(delay.train_id),
                minutes: delay.minutes,
                cause: delay.cause.to_string(),
                outcome,
            });
        }
        info!(scenario = self.name(), "scenario injected");
        Ok(ScenarioOutcome {
            scenario: self,
            message: self.message().to_string(),
            applied,
        })
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Scenario {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| ValidationError::UnknownScenario {
                name: s.to_string(),
            })
    }
}

/// Result of one scenario delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedDelay {
    /// Target train.
    pub train_id: TrainId,
    /// Minutes requested.
    pub minutes: u32,
    /// Reported cause.
    pub cause: String,
    /// What happened.
    pub outcome: DelayOutcome,
}

/// Result of applying a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioOutcome {
    /// Scenario applied.
    pub scenario: Scenario,
    /// Operator-facing summary.
    pub message: String,
    /// Per-delay results, in scenario order.
    pub applied: Vec<AppliedDelay>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::ScheduleRow;
    use chrono::{TimeZone, Utc};

    fn sim_with(ids: &[&str]) -> Simulator {
        let time = Utc.with_ymd_and_hms(2023, 10, 27, 12, 0, 0).unwrap();
        let rows = ids
            .iter()
            .map(|id| ScheduleRow::new(*id, "Delhi", time))
            .collect();
        Simulator::from_rows(rows, time - chrono::Duration::hours(1)).unwrap()
    }

    #[test]
    fn parse_known_and_unknown_names() {
        assert_eq!("single_breakdown".parse::<Scenario>(), Ok(Scenario::SingleBreakdown));
        assert_eq!(
            "weather_disruption".parse::<Scenario>(),
            Ok(Scenario::WeatherDisruption)
        );
        assert_eq!(
            "alien_invasion".parse::<Scenario>(),
            Err(ValidationError::UnknownScenario {
                name: "alien_invasion".to_string()
            })
        );
    }

    #[test]
    fn single_breakdown_delays_t105() {
        let mut sim = sim_with(&["T-105"]);
        let outcome = Scenario::SingleBreakdown.apply(&mut sim).unwrap();
        assert_eq!(outcome.applied[0].outcome, DelayOutcome::Applied { total_delay: 25 });
        let train = sim.train("T-105").unwrap();
        assert_eq!(train.delays()[0].cause, "Engine Failure");
    }

    #[test]
    fn weather_disruption_reports_missing_trains() {
        let mut sim = sim_with(&["T-102"]);
        let outcome = Scenario::WeatherDisruption.apply(&mut sim).unwrap();
        let results: Vec<DelayOutcome> = outcome.applied.iter().map(|a| a.outcome).collect();
        assert_eq!(
            results,
            vec![DelayOutcome::Applied { total_delay: 15 }, DelayOutcome::UnknownTrain]
        );
        assert!(outcome.message.contains("Foggy"));
    }
}
