//! Strategy-analysis agents
//!
//! - **HpcOrchestrator**: wraps the Field Twin, times updates and serves the
//!   aggregate strategic views

pub mod orchestrator;

pub use orchestrator::{
    CompetitorBehaviorPrediction, ConfidenceFactors, HpcOrchestrator, PerformanceMetrics, StrategicContext,
};
