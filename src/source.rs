//! Schedule sources.
//!
//! A [`ScheduleSource`] is the one-shot bulk loader the simulator reads its
//! initial schedules from. The simulator calls it at construction and on every
//! reset, and treats any error (or an empty result) as a recoverable load
//! failure.
//!
//! Two backends ship with the crate:
//! - [`InMemoryScheduleSource`] for embedded use and tests
//! - [`JsonFileScheduleSource`] for a JSON array of rows on disk

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use crate::error::LoadError;
use crate::schedule::ScheduleRow;

/// Source of raw schedule rows.
///
/// Implementations must be safe to call from any thread; the simulation
/// context calls `fetch` outside its registry lock.
pub trait ScheduleSource: Send + Sync {
    /// Fetch every schedule row.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::SourceUnavailable` if the backing store cannot be
    /// reached and `LoadError::Malformed` if its data cannot be decoded.
    fn fetch(&self) -> Result<Vec<ScheduleRow>, LoadError>;
}

/// In-memory schedule source.
#[derive(Debug, Default)]
pub struct InMemoryScheduleSource {
    rows: RwLock<Vec<ScheduleRow>>,
}

impl InMemoryScheduleSource {
    /// Creates a source serving the given rows.
    #[must_use]
    pub fn new(rows: Vec<ScheduleRow>) -> Self {
        Self {
            rows: RwLock::new(rows),
        }
    }

    /// Replaces the served rows. The next load or reset picks them up.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::SourceUnavailable` if the internal lock is poisoned.
    pub fn replace(&self, rows: Vec<ScheduleRow>) -> Result<(), LoadError> {
        let mut guard = self.rows.write().map_err(|_| lock_err())?;
        *guard = rows;
        Ok(())
    }
}

fn lock_err() -> LoadError {
    LoadError::SourceUnavailable {
        message: "poisoned lock: in-memory schedule source".to_string(),
    }
}

impl ScheduleSource for InMemoryScheduleSource {
    fn fetch(&self) -> Result<Vec<ScheduleRow>, LoadError> {
        let guard = self.rows.read().map_err(|_| lock_err())?;
        Ok(guard.clone())
    }
}

/// Schedule source backed by a JSON file holding an array of rows.
///
/// ```json
/// [{"train_id": "T-100", "station_name": "Delhi", "scheduled_time": "2023-10-27T08:00:00Z"}]
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileScheduleSource {
    path: PathBuf,
}

impl JsonFileScheduleSource {
    /// Creates a source reading from `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ScheduleSource for JsonFileScheduleSource {
    fn fetch(&self) -> Result<Vec<ScheduleRow>, LoadError> {
        let bytes = fs::read(&self.path).map_err(|e| LoadError::SourceUnavailable {
            message: format!("{}: {e}", self.path.display()),
        })?;
        serde_json::from_slice(&bytes).map_err(|e| LoadError::Malformed {
            message: format!("{}: {e}", self.path.display()),
        })
    }
}
