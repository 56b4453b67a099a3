//! Shared data structures for the Field Twin strategy engine
//!
//! - Telemetry: TelemetryFrame, CarSnapshot (normalized per-lap input)
//! - Strategy: ThreatLevel, PredictedStrategy, BehavioralProfile, PitStopRecord,
//!   StrategicOpportunity
//! - Events: RaceEvent log entries

mod telemetry;
mod strategy;
mod events;

pub use telemetry::*;
pub use strategy::*;
pub use events::*;
