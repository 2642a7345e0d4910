//! # railcast - Rail Network Delay Simulation
//!
//! railcast runs a deterministic, time-stepped simulation of trains moving
//! through fixed station schedules, lets operators inject delays, estimates
//! how a delay spreads to other trains sharing stations, and turns that
//! estimate into prioritized dispatch advice.
//!
//! ## Core Concepts
//!
//! - **Train**: A schedule-following state machine (on time, delayed, finished)
//! - **Simulator**: The simulated clock plus the registry of trains
//! - **Cascade**: The secondary delay a primary delay imposes on trains that
//!   still have to pass any of the same stations
//! - **Recommendation**: Threshold-driven advice for one cascade estimate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use railcast::{InMemoryScheduleSource, RiskLevel, SimulationConfig, SimulationContext};
//!
//! let source = Arc::new(InMemoryScheduleSource::new(rows));
//! let ctx = SimulationContext::new(source, SimulationConfig::default())?;
//!
//! ctx.step(30)?;
//! ctx.add_delay_event("T-105", 25, "Engine Failure")?;
//!
//! let impact = ctx.analyze_cascade("T-105", 45)?;
//! for rec in ctx.generate_recommendations(&impact, RiskLevel::High) {
//!     println!("[{:?}] {}", rec.priority, rec.action);
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Domain model
pub mod clock;
pub mod error;
pub mod schedule;
pub mod train;

// Simulation
pub mod config;
pub mod events;
pub mod scenario;
pub mod simulator;
pub mod source;

// Analysis
pub mod cascade;
pub mod predictor;
pub mod recommend;

// Shared state
pub mod context;

pub use cascade::{
    AffectedTrain, CascadeAnalyzer, CascadeImpact, FixedMultiplier, MultiplierSource,
    SeededMultiplier,
};
pub use clock::SimulationClock;
pub use config::{CascadeConfig, RecommendationThresholds, SimulationConfig};
pub use context::{Assessment, SimulationContext};
pub use error::{ExecutionError, LoadError, RailError, RailResult, ValidationError};
pub use events::{EventBus, EventStream, SimulationEvent};
pub use predictor::{DelayPredictor, FeatureRecord, HeuristicPredictor, Prediction, RiskLevel};
pub use recommend::{Priority, Recommendation, RecommendationEngine};
pub use scenario::{Scenario, ScenarioOutcome};
pub use schedule::{ScheduleEntry, ScheduleRow, ScheduleSet};
pub use simulator::{
    DelayOutcome, Readiness, RunId, ServiceLabel, Simulator, Snapshot, StepReport, TrainSnapshot,
    END_OF_LINE,
};
pub use source::{InMemoryScheduleSource, JsonFileScheduleSource, ScheduleSource};
pub use train::{DelayRecord, Train, TrainId, TrainStatus, Transition};
