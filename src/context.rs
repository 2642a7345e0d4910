//! Shared simulation context.
//!
//! [`SimulationContext`] is the handle a host process constructs once at
//! startup and hands to every caller (request handlers, drivers, tests). It
//! owns the [`Simulator`] behind a single `RwLock`:
//!
//! - `step`, `add_delay_event`, `inject_scenario`, `load_schedules` and
//!   `reset` take the write lock
//! - `snapshot` and `analyze_cascade` take the read lock
//!
//! `reset` and `load_schedules` build the replacement simulator before taking
//! the lock and swap it in whole, so readers see either the old registry or
//! the new one, never a mix. Events are published before the write lock is
//! released, so subscribers see them in the order the mutations happened.
//! Publishing never blocks.

use std::fmt;
use std::sync::{Arc, Mutex, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cascade::{CascadeAnalyzer, CascadeImpact, MultiplierSource};
use crate::config::SimulationConfig;
use crate::error::{ExecutionError, RailError, RailResult};
use crate::events::{EventBus, EventStream, SimulationEvent};
use crate::predictor::{DelayPredictor, FeatureRecord, Prediction, RiskLevel};
use crate::recommend::{Recommendation, RecommendationEngine};
use crate::scenario::{Scenario, ScenarioOutcome};
use crate::schedule::ScheduleRow;
use crate::simulator::{DelayOutcome, Readiness, Simulator, Snapshot, StepReport};
use crate::source::ScheduleSource;
use crate::train::TrainId;

fn lock_err() -> RailError {
    RailError::internal("simulation lock poisoned")
}

fn ensure_ready(readiness: &Readiness) -> RailResult<()> {
    match readiness {
        Readiness::Ready => Ok(()),
        Readiness::NotReady { reason } => Err(RailError::Execution(ExecutionError::NotReady {
            reason: reason.clone(),
        })),
    }
}

/// Prediction, cascade impact and recommendations for one train.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    /// Predictor output, unmodified.
    pub prediction: Prediction,
    /// Cascade impact of the predicted delay.
    pub impact: CascadeImpact,
    /// Advice for the impact and predicted risk.
    pub recommendations: Vec<Recommendation>,
}

/// Process-owned simulation state.
pub struct SimulationContext {
    config: SimulationConfig,
    source: Arc<dyn ScheduleSource>,
    state: RwLock<Simulator>,
    cascade: Mutex<CascadeAnalyzer>,
    recommendations: RecommendationEngine,
    events: EventBus,
}

impl fmt::Debug for SimulationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimulationContext")
            .field("config", &self.config)
            .field("state", &self.state)
            .field("recommendations", &self.recommendations)
            .field("events", &self.events)
            .finish_non_exhaustive()
    }
}

impl SimulationContext {
    /// Creates a context and performs the initial schedule load.
    ///
    /// A failed load does not fail construction: the context starts
    /// `NotReady` and can be recovered with [`Self::reset`].
    ///
    /// # Errors
    ///
    /// Returns a validation error if `config` is invalid.
    pub fn new(source: Arc<dyn ScheduleSource>, config: SimulationConfig) -> RailResult<Self> {
        config.validate()?;
        let simulator = Simulator::load(source.as_ref(), config.start_time);
        Ok(Self {
            cascade: Mutex::new(CascadeAnalyzer::new(config.cascade)),
            recommendations: RecommendationEngine::new(config.thresholds),
            events: EventBus::new(config.event_capacity),
            state: RwLock::new(simulator),
            source,
            config,
        })
    }

    /// Replaces the cascade multiplier source (for example with a fixed one in tests).
    #[must_use]
    pub fn with_multiplier_source(self, source: Box<dyn MultiplierSource>) -> Self {
        Self {
            cascade: Mutex::new(CascadeAnalyzer::with_source(self.config.cascade, source)),
            ..self
        }
    }

    fn read(&self) -> RailResult<RwLockReadGuard<'_, Simulator>> {
        self.state.read().map_err(|_| lock_err())
    }

    fn write(&self) -> RailResult<RwLockWriteGuard<'_, Simulator>> {
        self.state.write().map_err(|_| lock_err())
    }

    fn publish_finished(&self, report: &StepReport) {
        for train_id in &report.finished {
            self.events.publish(&SimulationEvent::TrainFinished {
                train_id: train_id.clone(),
                at: report.now,
            });
        }
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Whether the last load succeeded.
    pub fn readiness(&self) -> RailResult<Readiness> {
        Ok(self.read()?.readiness().clone())
    }

    /// Runs `f` against the simulator under the read lock.
    pub fn with_simulator<R>(&self, f: impl FnOnce(&Simulator) -> R) -> RailResult<R> {
        let sim = self.read()?;
        Ok(f(&sim))
    }

    /// Subscribes to simulation events.
    #[must_use]
    pub fn subscribe(&self) -> EventStream {
        self.events.subscribe()
    }

    /// Advances the clock by `minutes` and updates every train.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `minutes` is zero or the clock would
    /// leave the representable time range.
    pub fn step(&self, minutes: u32) -> RailResult<StepReport> {
        let mut sim = self.write()?;
        let report = sim.step(minutes)?;
        self.publish_finished(&report);
        Ok(report)
    }

    /// Steps by the configured `auto_step_minutes` and returns the resulting
    /// snapshot, both under one write lock.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NotReady` without stepping if schedules are
    /// not loaded.
    pub fn advance_and_snapshot(&self) -> RailResult<Snapshot> {
        let mut sim = self.write()?;
        ensure_ready(sim.readiness())?;
        let report = sim.step(self.config.auto_step_minutes)?;
        self.publish_finished(&report);
        Ok(sim.snapshot())
    }

    /// Injects a delay. Returns `false` if no such train exists.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `minutes` is zero.
    pub fn add_delay_event(&self, train_id: &str, minutes: u32, cause: &str) -> RailResult<bool> {
        let mut sim = self.write()?;
        let outcome = sim.add_delay_event(train_id, minutes, cause)?;
        if let DelayOutcome::Applied { total_delay } = outcome {
            self.events.publish(&SimulationEvent::DelayInjected {
                train_id: TrainId::new(train_id),
                minutes,
                total_delay,
                cause: cause.to_string(),
                at: sim.now(),
            });
        }
        Ok(outcome.succeeded())
    }

    /// Applies a named scenario.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::UnknownScenario` for an unrecognized name.
    pub fn inject_scenario(&self, name: &str) -> RailResult<ScenarioOutcome> {
        let scenario: Scenario = name.parse()?;
        let mut sim = self.write()?;
        let outcome = scenario.apply(&mut sim)?;
        let at = sim.now();
        for delay in &outcome.applied {
            if let DelayOutcome::Applied { total_delay } = delay.outcome {
                self.events.publish(&SimulationEvent::DelayInjected {
                    train_id: delay.train_id.clone(),
                    minutes: delay.minutes,
                    total_delay,
                    cause: delay.cause.clone(),
                    at,
                });
            }
        }
        Ok(outcome)
    }

    /// Every active train plus the clock.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::NotReady` if schedules are not loaded, so
    /// callers can tell a failed load from a network with no active trains.
    pub fn snapshot(&self) -> RailResult<Snapshot> {
        let sim = self.read()?;
        ensure_ready(sim.readiness())?;
        Ok(sim.snapshot())
    }

    /// Estimates the network impact of delaying `train_id` by `delay_minutes`.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::TrainNotFound` for an unknown train.
    pub fn analyze_cascade(&self, train_id: &str, delay_minutes: u32) -> RailResult<CascadeImpact> {
        let sim = self.read()?;
        let mut analyzer = self.cascade.lock().map_err(|_| lock_err())?;
        analyzer.analyze(&sim, train_id, delay_minutes)
    }

    /// Recommendations for an impact at the given risk level.
    #[must_use]
    pub fn generate_recommendations(
        &self,
        impact: &CascadeImpact,
        risk: RiskLevel,
    ) -> Vec<Recommendation> {
        self.recommendations.generate(impact, risk)
    }

    /// Predicts the delay of `train_id`, analyzes its cascade and recommends
    /// actions.
    ///
    /// Hour, weekday and current delay come from the simulation; the other
    /// features are taken from `conditions`. The predictor is called without
    /// holding the simulation lock.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::TrainNotFound` for an unknown train and
    /// propagates predictor errors unchanged.
    pub fn assess(
        &self,
        train_id: &str,
        predictor: &dyn DelayPredictor,
        conditions: &FeatureRecord,
    ) -> RailResult<Assessment> {
        let features = {
            let sim = self.read()?;
            let train = sim
                .train(train_id)
                .ok_or_else(|| RailError::train_not_found(TrainId::new(train_id)))?;
            let clock = FeatureRecord::at(sim.now(), train.delay_minutes());
            FeatureRecord {
                hour: clock.hour,
                day_of_week: clock.day_of_week,
                current_delay: clock.current_delay,
                ..conditions.clone()
            }
        };

        let prediction = predictor.predict(&features)?;
        let impact = self.analyze_cascade(train_id, prediction.whole_minutes())?;
        let recommendations = self.generate_recommendations(&impact, prediction.risk_level);
        debug!(
            train = train_id,
            risk = ?prediction.risk_level,
            recommendations = recommendations.len(),
            "assessment complete"
        );
        Ok(Assessment {
            prediction,
            impact,
            recommendations,
        })
    }

    /// Re-fetches schedules from the source and atomically replaces the
    /// registry, rewinding the clock.
    ///
    /// A failed fetch leaves the context empty and `NotReady`; the returned
    /// readiness says which.
    pub fn reset(&self) -> RailResult<Readiness> {
        let fresh = Simulator::load(self.source.as_ref(), self.config.start_time);
        self.install(fresh)
    }

    /// Atomically replaces the registry with `rows`.
    ///
    /// # Errors
    ///
    /// Returns the load error after switching to the empty `NotReady` state.
    pub fn load_schedules(&self, rows: Vec<ScheduleRow>) -> RailResult<usize> {
        match Simulator::from_rows(rows, self.config.start_time) {
            Ok(fresh) => {
                let count = fresh.len();
                self.install(fresh)?;
                Ok(count)
            }
            Err(err) => {
                self.install(Simulator::not_ready(self.config.start_time, err.to_string()))?;
                Err(err.into())
            }
        }
    }

    fn install(&self, fresh: Simulator) -> RailResult<Readiness> {
        let run_id = fresh.run_id();
        let readiness = fresh.readiness().clone();
        let trains = fresh.len();
        let mut sim = self.write()?;
        *sim = fresh;

        info!(%run_id, trains, ready = readiness.is_ready(), "simulation state replaced");
        self.events.publish(&SimulationEvent::Reset {
            run_id,
            ready: readiness.is_ready(),
        });
        Ok(readiness)
    }
}
