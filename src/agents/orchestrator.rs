//! HPC Orchestrator - strategy-analysis layer over the Field Twin
//!
//! Owns one `FieldTwin`, times every update, and assembles the aggregate
//! strategic views on demand.
//!
//! ## Views
//!
//! | Call                          | Output                                   |
//! |-------------------------------|------------------------------------------|
//! | `strategic_analysis()`        | summary, threats, recommendations, situation |
//! | `predict_competitor_behavior` | one car's forecast with confidence       |
//! | `performance_metrics()`       | update timing and counts                 |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::config::RaceConfig;
use crate::strategic::StrategicAnalysis;
use crate::twin::{CompetitorModel, CompetitorPrediction, FieldTwin, TwinError, SECONDS_PER_LAP};
use crate::types::{BehavioralProfile, PredictedStrategy, TelemetryFrame, ThreatLevel};

/// Accuracy assumed for past behavior predictions until outcomes are scored
const HISTORICAL_ACCURACY: f64 = 0.8;

// ============================================================================
// Output Types
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceMetrics {
    pub total_updates: u64,
    pub average_update_ms: f64,
    pub last_update_ms: f64,
    pub competitor_count: usize,
    pub last_update: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategicContext {
    pub current_threat_level: ThreatLevel,
    pub pit_probability: f64,
    pub predicted_strategy: PredictedStrategy,
    pub behavioral_profile: BehavioralProfile,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ConfidenceFactors {
    pub data_quality: f64,
    pub behavioral_consistency: f64,
    pub historical_accuracy: f64,
    pub situational_stability: f64,
}

impl ConfidenceFactors {
    fn for_competitor(c: &CompetitorModel) -> Self {
        Self {
            data_quality: (c.lap_times_history().len() as f64 / 10.0).min(1.0),
            behavioral_consistency: c.behavioral_profile().tire_management,
            historical_accuracy: HISTORICAL_ACCURACY,
            situational_stability: 1.0 - c.pit_probability(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorBehaviorPrediction {
    pub car_id: String,
    pub horizon_seconds: u64,
    pub prediction: CompetitorPrediction,
    pub strategic_context: StrategicContext,
    pub confidence_factors: ConfidenceFactors,
}

// ============================================================================
// Orchestrator
// ============================================================================

#[derive(Debug)]
pub struct HpcOrchestrator {
    twin: FieldTwin,
    max_update_time_ms: u64,
    total_updates: u64,
    average_update_ms: f64,
    last_update_ms: f64,
}

impl HpcOrchestrator {
    pub fn new(config: &RaceConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            twin: FieldTwin::new(config, clock),
            max_update_time_ms: config.performance.max_update_time_ms,
            total_updates: 0,
            average_update_ms: 0.0,
            last_update_ms: 0.0,
        }
    }

    /// Feed one frame to the twin and fold its duration into the running
    /// average. Rejected frames are not timed.
    pub fn update_field_twin(&mut self, frame: &TelemetryFrame) -> Result<(), TwinError> {
        let started = Instant::now();
        self.twin.update_state(frame)?;
        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;

        self.total_updates += 1;
        self.last_update_ms = elapsed_ms;
        let n = self.total_updates as f64;
        self.average_update_ms = (self.average_update_ms * (n - 1.0) + elapsed_ms) / n;

        if elapsed_ms > self.max_update_time_ms as f64 {
            warn!(
                elapsed_ms,
                limit_ms = self.max_update_time_ms,
                lap = self.twin.race_context().current_lap,
                "Field twin update exceeded time budget"
            );
        } else {
            debug!(elapsed_ms, "Field twin updated");
        }
        Ok(())
    }

    pub fn strategic_analysis(&self) -> StrategicAnalysis {
        StrategicAnalysis::from_twin(&self.twin)
    }

    /// Forecast for one car; `None` if the car has never been seen.
    pub fn predict_competitor_behavior(
        &self,
        car_id: &str,
        horizon_seconds: u64,
    ) -> Option<CompetitorBehaviorPrediction> {
        let competitor = self.twin.get_competitor(car_id)?;
        let future_laps = u32::try_from(horizon_seconds / SECONDS_PER_LAP).unwrap_or(u32::MAX);

        Some(CompetitorBehaviorPrediction {
            car_id: car_id.to_string(),
            horizon_seconds,
            prediction: self.twin.predict_competitor(competitor, future_laps),
            strategic_context: StrategicContext {
                current_threat_level: competitor.threat_level(),
                pit_probability: competitor.pit_probability(),
                predicted_strategy: competitor.predicted_strategy(),
                behavioral_profile: *competitor.behavioral_profile(),
            },
            confidence_factors: ConfidenceFactors::for_competitor(competitor),
        })
    }

    pub fn performance_metrics(&self) -> PerformanceMetrics {
        PerformanceMetrics {
            total_updates: self.total_updates,
            average_update_ms: self.average_update_ms,
            last_update_ms: self.last_update_ms,
            competitor_count: self.twin.competitor_count(),
            last_update: self.twin.last_update(),
        }
    }

    pub fn field_twin(&self) -> &FieldTwin {
        &self.twin
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::types::{CarSnapshot, TireSnapshot};

    fn car(id: &str, position: u32, tire_age: u32) -> CarSnapshot {
        CarSnapshot {
            car_id: id.to_string(),
            team: Some(format!("Team {id}")),
            position: Some(position),
            tire: TireSnapshot {
                age: Some(tire_age),
                wear_level: Some(0.3),
                ..Default::default()
            },
            fuel_level: Some(0.7),
            lap_time: Some(85.0 + f64::from(position) * 0.2),
            ..Default::default()
        }
    }

    fn create_sample_frame(lap: u32) -> TelemetryFrame {
        TelemetryFrame {
            lap: Some(lap),
            cars: vec![car("1", 1, lap), car("44", 2, lap), car("16", 3, lap)],
            ..Default::default()
        }
    }

    fn orchestrator() -> HpcOrchestrator {
        HpcOrchestrator::new(&RaceConfig::default(), Arc::new(ManualClock::at_epoch()))
    }

    #[test]
    fn counts_only_accepted_updates() {
        let mut orch = orchestrator();
        orch.update_field_twin(&create_sample_frame(1)).unwrap();
        orch.update_field_twin(&create_sample_frame(2)).unwrap();
        assert!(orch.update_field_twin(&TelemetryFrame::default()).is_err());

        let metrics = orch.performance_metrics();
        assert_eq!(metrics.total_updates, 2);
        assert_eq!(metrics.competitor_count, 2);
        assert!(metrics.average_update_ms >= 0.0);
        assert_eq!(orch.field_twin().frames_rejected(), 1);
    }

    #[test]
    fn unknown_car_has_no_behavior_prediction() {
        let mut orch = orchestrator();
        orch.update_field_twin(&create_sample_frame(1)).unwrap();
        assert!(orch.predict_competitor_behavior("99", 300).is_none());
        // Our own car is not a competitor
        assert!(orch.predict_competitor_behavior("44", 300).is_none());
    }

    #[test]
    fn behavior_prediction_carries_confidence() {
        let mut orch = orchestrator();
        for lap in 1..=5 {
            orch.update_field_twin(&create_sample_frame(lap)).unwrap();
        }
        let p = orch.predict_competitor_behavior("16", 450).unwrap();
        assert_eq!(p.horizon_seconds, 450);
        assert!((p.confidence_factors.data_quality - 0.5).abs() < 1e-9);
        assert_eq!(p.confidence_factors.historical_accuracy, 0.8);
        assert_eq!(p.prediction.lap_time_evolution.len(), 5);
    }

    #[test]
    fn analysis_reflects_latest_frame() {
        let mut orch = orchestrator();
        orch.update_field_twin(&create_sample_frame(30)).unwrap();
        let analysis = orch.strategic_analysis();
        assert_eq!(analysis.competitor_summary.total_competitors, 2);
        assert_eq!(analysis.race_situation.current_lap, 30);
        assert_eq!(analysis.field_state.competitors.len(), 2);
    }
}
