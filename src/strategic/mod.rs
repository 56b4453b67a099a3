//! Strategic Analysis Module
//!
//! Aggregate views computed on demand from a `FieldTwin`. Every function here
//! is a pure read of the twin; nothing is cached between calls.
//!
//! - `aggregation`: counts per threat level and strategy, behavioral spread
//! - `threats`: immediate / emerging threats and the overall risk level
//! - `recommendations`: opportunity, defensive and monitoring advice
//! - `situation`: race phase, complexity, key factors and dynamics

mod aggregation;
mod recommendations;
mod situation;
mod threats;

pub use aggregation::{CompetitorSummary, PatternStats, StrategicPatterns};
pub use recommendations::{generate_recommendations, Priority, Recommendation, RecommendationKind};
pub use situation::{key_factors, race_dynamics, RaceDynamics, RacePhase, RaceSituation, StrategicComplexity};
pub use threats::{StrategicRisk, ThreatAssessment, ThreatEntry};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::twin::{FieldTwin, FieldTwinState};
use crate::types::StrategicOpportunity;

/// Full strategic picture at the last processed frame
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategicAnalysis {
    pub timestamp: DateTime<Utc>,
    pub field_state: FieldTwinState,
    pub competitor_summary: CompetitorSummary,
    pub threat_assessment: ThreatAssessment,
    pub opportunities: Vec<StrategicOpportunity>,
    pub recommendations: Vec<Recommendation>,
    pub race_situation: RaceSituation,
}

impl StrategicAnalysis {
    pub fn from_twin(twin: &FieldTwin) -> Self {
        let field_state = twin.current_state();
        let threat_assessment = ThreatAssessment::assess(twin.competitors());
        Self {
            timestamp: field_state.timestamp,
            competitor_summary: CompetitorSummary::from_competitors(twin.competitors()),
            opportunities: twin.strategic_opportunities().to_vec(),
            recommendations: generate_recommendations(twin, &threat_assessment),
            race_situation: RaceSituation::assess(twin, &threat_assessment),
            threat_assessment,
            field_state,
        }
    }
}
