//! Error types for railcast.
//!
//! All errors are strongly typed using thiserror, layered the same way the
//! public operations are: input validation, execution against the registry,
//! and schedule loading. `RailError` is the umbrella type returned by the
//! simulation context.

use thiserror::Error;

use crate::train::TrainId;

/// Validation errors for malformed input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Delay must be a positive number of minutes, got {minutes}")]
    NonPositiveDelay {
        minutes: u32,
    },

    #[error("Step must advance the clock by a positive number of minutes, got {minutes}")]
    NonPositiveStep {
        minutes: u32,
    },

    #[error("Unknown scenario '{name}'")]
    UnknownScenario {
        name: String,
    },

    #[error("Train id cannot be empty")]
    EmptyTrainId,

    #[error("Station name cannot be empty (train {train_id})")]
    EmptyStationName {
        train_id: String,
    },

    #[error("Schedule for train {train_id} has no stops")]
    EmptySchedule {
        train_id: String,
    },

    #[error("Confidence value {value} is out of range [0.0, 1.0]")]
    ConfidenceOutOfRange {
        value: f32,
    },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("Advancing the clock by {minutes} minutes leaves the representable time range")]
    ClockOverflow {
        minutes: u32,
    },
}

/// Errors raised while executing an operation against the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("Train not found: {id}")]
    TrainNotFound {
        id: TrainId,
    },

    #[error("Simulation is not ready: {reason}")]
    NotReady {
        reason: String,
    },
}

/// Errors raised while loading schedules from a [`crate::ScheduleSource`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("Schedule source unavailable: {message}")]
    SourceUnavailable {
        message: String,
    },

    #[error("Schedule source returned no usable rows")]
    Empty,

    #[error("Malformed schedule data: {message}")]
    Malformed {
        message: String,
    },
}

/// Top-level error type for railcast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RailError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl RailError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Creates a not-found error for the given train.
    #[must_use]
    pub fn train_not_found(id: TrainId) -> Self {
        Self::Execution(ExecutionError::TrainNotFound { id })
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is a load error.
    #[must_use]
    pub const fn is_load(&self) -> bool {
        matches!(self, Self::Load(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if the referenced train does not exist.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Execution(ExecutionError::TrainNotFound { .. }))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Execution(e) => matches!(e, ExecutionError::NotReady { .. }),
            Self::Load(e) => matches!(e, LoadError::SourceUnavailable { .. }),
            Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for railcast operations.
pub type RailResult<T> = Result<T, RailError>;
