//! Race event log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PitStopRecord, RiskLevel, TrackStatus};

/// What caused a re-simulation request
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ResimulationTrigger {
    SafetyCar,
    PitStop,
}

impl std::fmt::Display for ResimulationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResimulationTrigger::SafetyCar => write!(f, "safety_car"),
            ResimulationTrigger::PitStop => write!(f, "pit_stop"),
        }
    }
}

/// Payload of a detected race event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RaceEventKind {
    TrackStatusChange {
        old_status: TrackStatus,
        new_status: TrackStatus,
    },
    CompetitorPitStop {
        car_id: String,
        pit_data: PitStopRecord,
    },
    ResimulationTriggered {
        trigger_event: ResimulationTrigger,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        car_id: Option<String>,
        strategic_impact: RiskLevel,
    },
}

/// Append-only race event log entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceEvent {
    pub timestamp: DateTime<Utc>,
    pub lap: u32,
    #[serde(flatten)]
    pub kind: RaceEventKind,
}

impl RaceEvent {
    pub fn new(timestamp: DateTime<Utc>, lap: u32, kind: RaceEventKind) -> Self {
        Self { timestamp, lap, kind }
    }

    /// Short type label, matching the serialized `type` tag
    pub fn type_name(&self) -> &'static str {
        match self.kind {
            RaceEventKind::TrackStatusChange { .. } => "track_status_change",
            RaceEventKind::CompetitorPitStop { .. } => "competitor_pit_stop",
            RaceEventKind::ResimulationTriggered { .. } => "resimulation_triggered",
        }
    }
}
