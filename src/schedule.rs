//! Schedule types.
//!
//! A schedule is the ordered list of stops a single train makes. Schedules are
//! loaded once from a [`crate::ScheduleSource`] as flat rows and grouped per
//! train here; after that they are immutable.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::LoadError;
use crate::train::TrainId;

/// A single scheduled stop: station name and scheduled departure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScheduleEntry {
    /// Station name.
    pub station: String,
    /// Scheduled departure time (before any delay).
    pub departure: DateTime<Utc>,
}

impl ScheduleEntry {
    /// Creates a schedule entry.
    #[must_use]
    pub fn new(station: impl Into<String>, departure: DateTime<Utc>) -> Self {
        Self {
            station: station.into(),
            departure,
        }
    }
}

/// A raw schedule row as returned by a schedule source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Owning train.
    pub train_id: String,
    /// Station name.
    pub station_name: String,
    /// Scheduled departure time.
    pub scheduled_time: DateTime<Utc>,
}

impl ScheduleRow {
    /// Creates a schedule row.
    #[must_use]
    pub fn new(
        train_id: impl Into<String>,
        station_name: impl Into<String>,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            train_id: train_id.into(),
            station_name: station_name.into(),
            scheduled_time,
        }
    }

    fn is_usable(&self) -> bool {
        !self.train_id.trim().is_empty() && !self.station_name.trim().is_empty()
    }
}

/// Schedules grouped per train, each sorted ascending by departure.
pub type ScheduleSet = BTreeMap<TrainId, Vec<ScheduleEntry>>;

/// Groups raw rows into per-train schedules.
///
/// Rows with a blank train id or station name are skipped. Each train's stops
/// are sorted by departure time; the sort is stable, so stops sharing a
/// timestamp keep their source order.
///
/// # Errors
///
/// Returns `LoadError::Empty` if no usable rows remain.
pub fn group_rows(rows: Vec<ScheduleRow>) -> Result<ScheduleSet, LoadError> {
    let total = rows.len();
    let mut grouped = ScheduleSet::new();

    for row in rows {
        if !row.is_usable() {
            continue;
        }
        grouped
            .entry(TrainId::new(row.train_id.trim()))
            .or_default()
            .push(ScheduleEntry::new(row.station_name.trim(), row.scheduled_time));
    }

    let usable: usize = grouped.values().map(Vec::len).sum();
    if usable < total {
        warn!(skipped = total - usable, "skipped unusable schedule rows");
    }
    if grouped.is_empty() {
        return Err(LoadError::Empty);
    }

    for stops in grouped.values_mut() {
        stops.sort_by_key(|entry| entry.departure);
    }

    Ok(grouped)
}
