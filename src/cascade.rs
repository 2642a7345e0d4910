//! Cascade impact estimation.
//!
//! Given a delayed primary train, the analyzer finds every other train that
//! still shares at least one upcoming station with it and charges each a
//! random fraction of the primary delay. This is a heuristic signal, not a
//! track-conflict model.
//!
//! The random fraction comes from an injected [`MultiplierSource`], so runs
//! are reproducible for a given seed and tests can pin the draw exactly.

use std::collections::HashSet;
use std::fmt;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CascadeConfig;
use crate::error::{RailError, RailResult};
use crate::simulator::Simulator;
use crate::train::{Train, TrainId};

/// Source of delay multipliers.
pub trait MultiplierSource: Send {
    /// Draws a multiplier from `[low, high)`.
    fn draw(&mut self, low: f64, high: f64) -> f64;
}

/// Uniform multipliers from a seeded ChaCha8 stream.
#[derive(Debug, Clone)]
pub struct SeededMultiplier {
    rng: ChaCha8Rng,
}

impl SeededMultiplier {
    /// Creates a source seeded with `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl MultiplierSource for SeededMultiplier {
    fn draw(&mut self, low: f64, high: f64) -> f64 {
        self.rng.gen_range(low..high)
    }
}

/// Always returns the same multiplier, ignoring the requested range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedMultiplier(pub f64);

impl MultiplierSource for FixedMultiplier {
    fn draw(&mut self, _low: f64, _high: f64) -> f64 {
        self.0
    }
}

/// A train that picks up secondary delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AffectedTrain {
    /// Affected train.
    pub train_id: TrainId,
    /// Estimated extra minutes.
    pub additional_delay: u32,
    /// Human-readable cause naming the shared station.
    pub reason: String,
}

/// Network impact of one primary delay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeImpact {
    /// The delayed train the analysis started from.
    pub primary_id: TrainId,
    /// Primary delay in minutes.
    pub primary_delay: u32,
    /// Number of affected trains.
    pub affected_count: usize,
    /// Sum of all additional delays.
    pub total_impact_minutes: u32,
    /// Affected trains, ordered by id.
    pub affected: Vec<AffectedTrain>,
}

impl CascadeImpact {
    fn from_affected(primary_id: TrainId, primary_delay: u32, affected: Vec<AffectedTrain>) -> Self {
        let total_impact_minutes = affected
            .iter()
            .map(|a| a.additional_delay)
            .fold(0u32, u32::saturating_add);
        Self {
            primary_id,
            primary_delay,
            affected_count: affected.len(),
            total_impact_minutes,
            affected,
        }
    }
}

/// Scans the registry for trains affected by a primary delay.
pub struct CascadeAnalyzer {
    config: CascadeConfig,
    source: Box<dyn MultiplierSource>,
}

impl fmt::Debug for CascadeAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CascadeAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CascadeAnalyzer {
    /// Creates an analyzer drawing from a ChaCha8 stream seeded by `config.seed`.
    #[must_use]
    pub fn new(config: CascadeConfig) -> Self {
        Self::with_source(config, Box::new(SeededMultiplier::new(config.seed)))
    }

    /// Creates an analyzer with an explicit multiplier source.
    #[must_use]
    pub fn with_source(config: CascadeConfig, source: Box<dyn MultiplierSource>) -> Self {
        Self { config, source }
    }

    /// Estimates the knock-on effect of delaying `primary_id` by `primary_delay` minutes.
    ///
    /// Candidates are visited in train-id order and each consumes exactly one
    /// draw, so a given seed always yields the same result for the same
    /// registry.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::TrainNotFound` if `primary_id` is not registered.
    pub fn analyze(
        &mut self,
        sim: &Simulator,
        primary_id: &str,
        primary_delay: u32,
    ) -> RailResult<CascadeImpact> {
        let primary = sim
            .train(primary_id)
            .ok_or_else(|| RailError::train_not_found(TrainId::new(primary_id)))?;

        let mut affected = Vec::new();
        for other in sim.trains() {
            if other.id() == primary.id() {
                continue;
            }
            let Some(station) = first_shared_station(primary, &other.future_stations()) else {
                continue;
            };

            let multiplier = self
                .source
                .draw(self.config.min_multiplier, self.config.max_multiplier);
            let additional_delay = scale_delay(primary_delay, multiplier);
            if additional_delay > self.config.min_additional_delay {
                affected.push(AffectedTrain {
                    train_id: other.id().clone(),
                    additional_delay,
                    reason: format!("Track conflict with {} at {station}", primary.id()),
                });
            }
        }

        let impact = CascadeImpact::from_affected(primary.id().clone(), primary_delay, affected);
        debug!(
            primary = %impact.primary_id,
            primary_delay,
            affected = impact.affected_count,
            total_minutes = impact.total_impact_minutes,
            "cascade analysis complete"
        );
        Ok(impact)
    }
}

/// First station on the primary's remaining route that `other_future` also visits.
fn first_shared_station<'a>(primary: &'a Train, other_future: &HashSet<&str>) -> Option<&'a str> {
    primary
        .remaining_stops()
        .iter()
        .map(|stop| stop.station.as_str())
        .find(|station| other_future.contains(station))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scale_delay(minutes: u32, multiplier: f64) -> u32 {
    let scaled = (f64::from(minutes) * multiplier).floor();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else if scaled >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        scaled as u32
    }
}
