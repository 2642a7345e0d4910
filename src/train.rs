//! Train state machine.
//!
//! A [`Train`] walks its schedule in departure order. It leaves a stop once
//! the simulation clock reaches the stop's delay-adjusted departure, and
//! finishes once the clock passes the last stop's adjusted departure.
//!
//! ```text
//!   OnTime ──add_delay──▶ Delayed
//!     │                      │
//!     └──────update──────────┴──▶ Finished (absorbing)
//! ```

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::schedule::ScheduleEntry;

/// Stable identifier for a train (e.g. `T-105`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrainId(String);

impl TrainId {
    /// Creates a train id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TrainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for TrainId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TrainId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Lifecycle state of a train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainStatus {
    /// Running to schedule (initial state).
    OnTime,
    /// At least one delay has been injected.
    Delayed,
    /// Departed its last stop. Terminal.
    Finished,
}

impl TrainStatus {
    /// Returns true for the terminal state.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::Finished)
    }
}

/// A delay applied to a train.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRecord {
    /// Minutes added.
    pub minutes: u32,
    /// Free-form cause (e.g. "Weather", "Engine Failure").
    pub cause: String,
}

/// Outcome of a single [`Train::update`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Stay,
    /// Left the stop at `from` and is now at `to` (possibly several stops on).
    Advanced {
        /// Previous station index.
        from: usize,
        /// New station index.
        to: usize,
    },
    /// Departed the last stop.
    Finished,
}

/// One train and its progress along its schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Train {
    id: TrainId,
    schedule: Vec<ScheduleEntry>,
    current_index: usize,
    delay_minutes: u32,
    status: TrainStatus,
    delays: Vec<DelayRecord>,
}

impl Train {
    /// Creates a train at the first stop of its schedule.
    ///
    /// The schedule is sorted by departure time.
    ///
    /// # Errors
    ///
    /// Returns a `ValidationError` if the id is blank, the schedule is empty,
    /// or any stop has a blank station name.
    pub fn new(id: TrainId, mut schedule: Vec<ScheduleEntry>) -> Result<Self, ValidationError> {
        if id.as_str().trim().is_empty() {
            return Err(ValidationError::EmptyTrainId);
        }
        if schedule.is_empty() {
            return Err(ValidationError::EmptySchedule {
                train_id: id.to_string(),
            });
        }
        if schedule.iter().any(|e| e.station.trim().is_empty()) {
            return Err(ValidationError::EmptyStationName {
                train_id: id.to_string(),
            });
        }
        schedule.sort_by_key(|e| e.departure);

        Ok(Self {
            id,
            schedule,
            current_index: 0,
            delay_minutes: 0,
            status: TrainStatus::OnTime,
            delays: Vec::new(),
        })
    }

    /// Train id.
    #[must_use]
    pub const fn id(&self) -> &TrainId {
        &self.id
    }

    /// Full schedule, ascending by departure.
    #[must_use]
    pub fn schedule(&self) -> &[ScheduleEntry] {
        &self.schedule
    }

    /// Index of the current stop.
    #[must_use]
    pub const fn current_index(&self) -> usize {
        self.current_index
    }

    /// Accumulated delay in minutes.
    #[must_use]
    pub const fn delay_minutes(&self) -> u32 {
        self.delay_minutes
    }

    /// Current lifecycle state.
    #[must_use]
    pub const fn status(&self) -> TrainStatus {
        self.status
    }

    /// Delays applied so far, oldest first.
    #[must_use]
    pub fn delays(&self) -> &[DelayRecord] {
        &self.delays
    }

    /// Station at the current stop.
    #[must_use]
    pub fn current_location(&self) -> &str {
        &self.schedule[self.current_index].station
    }

    /// Station after the current stop, or `None` at the last stop.
    #[must_use]
    pub fn next_station(&self) -> Option<&str> {
        self.schedule
            .get(self.current_index + 1)
            .map(|e| e.station.as_str())
    }

    /// Returns true if the train is at its final stop.
    #[must_use]
    pub fn is_at_last_stop(&self) -> bool {
        self.current_index + 1 == self.schedule.len()
    }

    /// Stops from the current one through the end of the schedule.
    #[must_use]
    pub fn remaining_stops(&self) -> &[ScheduleEntry] {
        &self.schedule[self.current_index..]
    }

    /// Stations from the current stop through the end of the schedule.
    #[must_use]
    pub fn future_stations(&self) -> HashSet<&str> {
        self.remaining_stops()
            .iter()
            .map(|e| e.station.as_str())
            .collect()
    }

    /// Departure from the current stop, adjusted by the accumulated delay.
    ///
    /// `None` if the adjusted time is outside the representable range; such a
    /// departure never passes.
    #[must_use]
    pub fn actual_departure(&self) -> Option<DateTime<Utc>> {
        self.schedule[self.current_index]
            .departure
            .checked_add_signed(Duration::minutes(i64::from(self.delay_minutes)))
    }

    /// Advances the train against the clock.
    ///
    /// The train leaves every stop whose delay-adjusted departure is at or
    /// before `now`, so its position depends only on the absolute time and
    /// not on how the clock got there. It finishes once the last stop's
    /// adjusted departure has passed; arriving at the last stop does not
    /// finish it.
    ///
    /// One call may therefore pass several stops; this keeps `step(a)` then
    /// `step(b)` equal to `step(a + b)`.
    pub fn update(&mut self, now: DateTime<Utc>) -> Transition {
        if self.status.is_finished() {
            return Transition::Stay;
        }

        let from = self.current_index;
        while self.actual_departure().is_some_and(|departure| now >= departure) {
            if self.is_at_last_stop() {
                self.status = TrainStatus::Finished;
                return Transition::Finished;
            }
            self.current_index += 1;
        }

        if self.current_index == from {
            Transition::Stay
        } else {
            Transition::Advanced {
                from,
                to: self.current_index,
            }
        }
    }

    /// Adds delay to the train.
    ///
    /// Returns `Ok(false)` when the train has already finished; the call is
    /// then ignored. Delay only accumulates and the status never returns to
    /// `OnTime`.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NonPositiveDelay` if `minutes` is zero.
    pub fn add_delay(&mut self, minutes: u32, cause: impl Into<String>) -> Result<bool, ValidationError> {
        if minutes == 0 {
            return Err(ValidationError::NonPositiveDelay { minutes });
        }
        if self.status.is_finished() {
            return Ok(false);
        }

        self.delay_minutes = self.delay_minutes.saturating_add(minutes);
        self.status = TrainStatus::Delayed;
        self.delays.push(DelayRecord {
            minutes,
            cause: cause.into(),
        });
        Ok(true)
    }
}
