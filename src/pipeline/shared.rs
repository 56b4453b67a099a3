//! Single-writer twin with immutable snapshot handoff
//!
//! Every frame is applied under one mutex, so updates are strictly
//! sequential. After each accepted frame the writer publishes a fresh
//! `TwinSnapshot`; readers load the latest one without touching the lock.

use arc_swap::ArcSwap;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::agents::{CompetitorBehaviorPrediction, HpcOrchestrator, PerformanceMetrics};
use crate::strategic::StrategicAnalysis;
use crate::twin::{FieldPredictions, FieldTwinState, TwinError};
use crate::types::TelemetryFrame;

/// Fully computed view of the twin after one frame
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TwinSnapshot {
    pub state: FieldTwinState,
    pub analysis: StrategicAnalysis,
    pub performance: PerformanceMetrics,
}

impl TwinSnapshot {
    fn capture(orchestrator: &HpcOrchestrator) -> Self {
        Self {
            state: orchestrator.field_twin().current_state(),
            analysis: orchestrator.strategic_analysis(),
            performance: orchestrator.performance_metrics(),
        }
    }
}

pub struct SharedTwin {
    writer: Mutex<HpcOrchestrator>,
    latest: ArcSwap<TwinSnapshot>,
}

impl SharedTwin {
    pub fn new(orchestrator: HpcOrchestrator) -> Self {
        let initial = TwinSnapshot::capture(&orchestrator);
        Self {
            writer: Mutex::new(orchestrator),
            latest: ArcSwap::from_pointee(initial),
        }
    }

    /// Recovers the guard from a poisoned lock.
    fn lock(&self) -> MutexGuard<'_, HpcOrchestrator> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply one frame and publish the resulting snapshot.
    ///
    /// A rejected frame publishes nothing; readers keep the previous snapshot.
    pub fn ingest(&self, frame: &TelemetryFrame) -> Result<Arc<TwinSnapshot>, TwinError> {
        let mut orchestrator = self.lock();
        orchestrator.update_field_twin(frame)?;
        let snapshot = Arc::new(TwinSnapshot::capture(&orchestrator));
        self.latest.store(Arc::clone(&snapshot));
        debug!(
            lap = snapshot.state.race_context.current_lap,
            updates = snapshot.performance.total_updates,
            "Snapshot published"
        );
        Ok(snapshot)
    }

    /// Latest published snapshot. Never blocks on the writer.
    pub fn snapshot(&self) -> Arc<TwinSnapshot> {
        self.latest.load_full()
    }

    /// Predictions read the full model, so they briefly take the writer lock.
    pub fn predict(&self, horizon_seconds: u64) -> FieldPredictions {
        self.lock().field_twin().predict(horizon_seconds)
    }

    pub fn predict_competitor_behavior(
        &self,
        car_id: &str,
        horizon_seconds: u64,
    ) -> Option<CompetitorBehaviorPrediction> {
        self.lock().predict_competitor_behavior(car_id, horizon_seconds)
    }
}
