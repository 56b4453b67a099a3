//! Race Twin: Field Twin competitor modeling for race strategy
//!
//! Tracks every competitor from per-lap telemetry, estimates pit
//! probabilities and threat levels, detects race events and ranks strategic
//! opportunities against our car.
//!
//! ## Architecture
//!
//! - **Telemetry**: JSON frame normalization and validation
//! - **Twin**: CompetitorModel, FieldTwin, multi-lap predictions
//! - **Strategic**: aggregate views (summary, threats, recommendations, situation)
//! - **Agents**: HpcOrchestrator wrapping the twin
//! - **Pipeline**: single-writer ingestion with lock-free snapshot reads

pub mod agents;
pub mod clock;
pub mod config;
pub mod pipeline;
pub mod strategic;
pub mod telemetry;
pub mod twin;
pub mod types;

// Re-export configuration
pub use config::RaceConfig;

// Re-export commonly used types
pub use types::{
    CarSnapshot, OpportunityType, PredictedStrategy, RiskLevel, StrategicOpportunity, TelemetryFrame,
    ThreatLevel, TrackStatus,
};

pub use agents::HpcOrchestrator;
pub use clock::{Clock, ManualClock, SystemClock};
pub use pipeline::{SharedTwin, TwinSnapshot};
pub use strategic::StrategicAnalysis;
pub use twin::{CompetitorModel, FieldPredictions, FieldTwin, FieldTwinState, TwinError};
