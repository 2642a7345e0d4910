//! The simulator: clock plus train registry.
//!
//! [`Simulator`] is a plain single-threaded value. Sharing it between callers
//! is the job of [`crate::SimulationContext`], which puts it behind one lock
//! and swaps it atomically on reset.
//!
//! The registry is a `BTreeMap` keyed by train id, so every iteration (step,
//! snapshot, cascade scan) visits trains in id order.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::SimulationClock;
use crate::error::{LoadError, ValidationError};
use crate::schedule::{group_rows, ScheduleRow, ScheduleSet};
use crate::source::ScheduleSource;
use crate::train::{Train, TrainId, Transition};

/// Sentinel shown as the next station of a train at its last stop.
pub const END_OF_LINE: &str = "End of Line";

/// Identifier of one load/reset generation of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new random run ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether the registry was loaded successfully.
///
/// `NotReady` means the last load failed and the registry is empty. A ready
/// simulator whose trains have all finished is still `Ready`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Readiness {
    /// Schedules loaded.
    Ready,
    /// The last load failed.
    NotReady {
        /// Why the load failed.
        reason: String,
    },
}

impl Readiness {
    /// Returns true if schedules are loaded.
    #[must_use]
    pub const fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

/// Coarse status label shown in snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ServiceLabel {
    /// No delay accumulated.
    #[serde(rename = "On-Time")]
    OnTime,
    /// Some delay accumulated.
    #[serde(rename = "Delayed")]
    Delayed,
}

impl ServiceLabel {
    /// Label for a train with the given accumulated delay.
    #[must_use]
    pub const fn for_delay(delay_minutes: u32) -> Self {
        if delay_minutes > 0 {
            Self::Delayed
        } else {
            Self::OnTime
        }
    }

    /// Display text.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OnTime => "On-Time",
            Self::Delayed => "Delayed",
        }
    }
}

impl fmt::Display for ServiceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One active train as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainSnapshot {
    /// Train id.
    pub id: TrainId,
    /// Station at the current stop.
    pub current_station: String,
    /// Following station, or [`END_OF_LINE`].
    pub next_station: String,
    /// Accumulated delay.
    pub delay_minutes: u32,
    /// Coarse status.
    pub status: ServiceLabel,
}

impl TrainSnapshot {
    fn of(train: &Train) -> Self {
        Self {
            id: train.id().clone(),
            current_station: train.current_location().to_string(),
            next_station: train.next_station().unwrap_or(END_OF_LINE).to_string(),
            delay_minutes: train.delay_minutes(),
            status: ServiceLabel::for_delay(train.delay_minutes()),
        }
    }
}

/// Point-in-time view of every non-finished train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Generation of the registry this view was taken from.
    pub run_id: RunId,
    /// Simulated time.
    pub current_time: DateTime<Utc>,
    /// Active trains, ordered by id.
    pub trains: Vec<TrainSnapshot>,
}

/// What a single [`Simulator::step`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Clock value after the step.
    pub now: DateTime<Utc>,
    /// Number of trains that moved to their next stop.
    pub advanced: usize,
    /// Trains that finished during this step, ordered by id.
    pub finished: Vec<TrainId>,
}

/// Result of [`Simulator::add_delay_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    /// Delay added; carries the train's new accumulated delay.
    Applied {
        /// Accumulated delay after the event.
        total_delay: u32,
    },
    /// The train exists but has finished; nothing changed.
    AlreadyFinished,
    /// No train with that id.
    UnknownTrain,
}

impl DelayOutcome {
    /// Returns true if the train was found.
    #[must_use]
    pub const fn succeeded(self) -> bool {
        !matches!(self, Self::UnknownTrain)
    }
}

/// Simulation clock and train registry.
#[derive(Debug, Clone)]
pub struct Simulator {
    run_id: RunId,
    start_time: DateTime<Utc>,
    clock: SimulationClock,
    schedules: ScheduleSet,
    trains: BTreeMap<TrainId, Train>,
    readiness: Readiness,
}

impl Simulator {
    /// Creates an empty simulator in the `NotReady` state.
    #[must_use]
    pub fn not_ready(start_time: DateTime<Utc>, reason: impl Into<String>) -> Self {
        Self {
            run_id: RunId::new(),
            start_time,
            clock: SimulationClock::new(start_time),
            schedules: ScheduleSet::new(),
            trains: BTreeMap::new(),
            readiness: Readiness::NotReady {
                reason: reason.into(),
            },
        }
    }

    /// Builds a simulator from grouped schedules.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Empty` for an empty set and `LoadError::Malformed`
    /// if any schedule fails train validation.
    pub fn from_schedules(schedules: ScheduleSet, start_time: DateTime<Utc>) -> Result<Self, LoadError> {
        let trains = build_registry(&schedules)?;
        Ok(Self {
            run_id: RunId::new(),
            start_time,
            clock: SimulationClock::new(start_time),
            schedules,
            trains,
            readiness: Readiness::Ready,
        })
    }

    /// Builds a simulator from raw rows.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Empty` if no usable rows remain.
    pub fn from_rows(rows: Vec<ScheduleRow>, start_time: DateTime<Utc>) -> Result<Self, LoadError> {
        Self::from_schedules(group_rows(rows)?, start_time)
    }

    /// Loads schedules from a source.
    ///
    /// Never fails: a load error yields an empty `NotReady` simulator whose
    /// clock sits at `start_time`.
    pub fn load(source: &dyn ScheduleSource, start_time: DateTime<Utc>) -> Self {
        match source
            .fetch()
            .and_then(|rows| Self::from_rows(rows, start_time))
        {
            Ok(sim) => {
                info!(trains = sim.trains.len(), run_id = %sim.run_id, "loaded train schedules");
                sim
            }
            Err(err) => {
                warn!(error = %err, "could not load train schedules; simulator not ready");
                Self::not_ready(start_time, err.to_string())
            }
        }
    }

    /// Replaces the registry with freshly loaded rows and rewinds the clock.
    ///
    /// On failure the registry becomes empty and the simulator `NotReady`;
    /// it is never left half-loaded.
    ///
    /// # Errors
    ///
    /// Returns the load error after entering the `NotReady` state.
    pub fn load_schedules(&mut self, rows: Vec<ScheduleRow>) -> Result<usize, LoadError> {
        match Self::from_rows(rows, self.start_time) {
            Ok(sim) => {
                *self = sim;
                info!(trains = self.trains.len(), run_id = %self.run_id, "loaded train schedules");
                Ok(self.trains.len())
            }
            Err(err) => {
                warn!(error = %err, "could not load train schedules; simulator not ready");
                *self = Self::not_ready(self.start_time, err.to_string());
                Err(err)
            }
        }
    }

    /// Discards all delay and position state, rebuilding every train from the
    /// initially loaded schedules and rewinding the clock.
    pub fn reset(&mut self) {
        let reason = match &self.readiness {
            Readiness::Ready => None,
            Readiness::NotReady { reason } => Some(reason.clone()),
        };
        *self = match reason {
            Some(reason) => Self::not_ready(self.start_time, reason),
            None => Self::from_schedules(std::mem::take(&mut self.schedules), self.start_time)
                .unwrap_or_else(|err| Self::not_ready(self.start_time, err.to_string())),
        };
        info!(trains = self.trains.len(), run_id = %self.run_id, "simulation reset");
    }

    /// Advances the clock by `minutes` and updates every train.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveStep` if `minutes` is zero; the
    /// clock and trains are then unchanged.
    pub fn step(&mut self, minutes: u32) -> Result<StepReport, ValidationError> {
        let now = self.clock.advance(minutes)?;
        let mut report = StepReport {
            now,
            advanced: 0,
            finished: Vec::new(),
        };

        for train in self.trains.values_mut() {
            match train.update(now) {
                Transition::Stay => {}
                Transition::Advanced { .. } => report.advanced += 1,
                Transition::Finished => {
                    debug!(train = %train.id(), "train finished");
                    report.finished.push(train.id().clone());
                }
            }
        }

        Ok(report)
    }

    /// Injects a delay into one train.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveDelay` if `minutes` is zero,
    /// before looking up the train.
    pub fn add_delay_event(
        &mut self,
        train_id: &str,
        minutes: u32,
        cause: &str,
    ) -> Result<DelayOutcome, ValidationError> {
        if minutes == 0 {
            return Err(ValidationError::NonPositiveDelay { minutes });
        }
        let Some(train) = self.trains.get_mut(train_id) else {
            debug!(train = train_id, "delay event for unknown train");
            return Ok(DelayOutcome::UnknownTrain);
        };

        if train.add_delay(minutes, cause)? {
            info!(train = train_id, minutes, cause, "injected delay");
            Ok(DelayOutcome::Applied {
                total_delay: train.delay_minutes(),
            })
        } else {
            debug!(train = train_id, "delay event for finished train ignored");
            Ok(DelayOutcome::AlreadyFinished)
        }
    }

    /// Every non-finished train, ordered by id, plus the clock.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            run_id: self.run_id,
            current_time: self.clock.now(),
            trains: self
                .trains
                .values()
                .filter(|t| !t.status().is_finished())
                .map(TrainSnapshot::of)
                .collect(),
        }
    }

    /// Looks up a train.
    #[must_use]
    pub fn train(&self, id: &str) -> Option<&Train> {
        self.trains.get(id)
    }

    /// All trains, ordered by id.
    pub fn trains(&self) -> impl Iterator<Item = &Train> {
        self.trains.values()
    }

    /// Number of registered trains, finished ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.trains.len()
    }

    /// Returns true if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.trains.is_empty()
    }

    /// Current simulated time.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Clock value used at construction and reset.
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Generation of the current registry.
    #[must_use]
    pub const fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Load state.
    #[must_use]
    pub const fn readiness(&self) -> &Readiness {
        &self.readiness
    }
}

fn build_registry(schedules: &ScheduleSet) -> Result<BTreeMap<TrainId, Train>, LoadError> {
    if schedules.is_empty() {
        return Err(LoadError::Empty);
    }
    schedules
        .iter()
        .map(|(id, stops)| {
            Train::new(id.clone(), stops.clone())
                .map(|train| (id.clone(), train))
                .map_err(|e| LoadError::Malformed {
                    message: e.to_string(),
                })
        })
        .collect()
}
