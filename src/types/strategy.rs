//! Strategy types: threat levels, predicted strategies, behavioral profile,
//! pit-stop records and strategic opportunities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TireCompound;

/// Target label for opportunities that concern the whole field rather than one car
pub const FIELD_TARGET: &str = "field";

// ============================================================================
// Threat / Risk Levels
// ============================================================================

/// Strategic threat a competitor poses to our car.
///
/// Ordered so that `High > Medium`; the same scale doubles as the overall
/// risk level and the strategic impact of race events.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum ThreatLevel {
    Low = 0,
    #[default]
    Medium = 1,
    High = 2,
    Critical = 3,
}

/// Overall risk and event impact share the threat scale
pub type RiskLevel = ThreatLevel;

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }

    /// One notch up, saturating at `Critical`
    pub fn escalate(self) -> Self {
        match self {
            ThreatLevel::Low => ThreatLevel::Medium,
            ThreatLevel::Medium => ThreatLevel::High,
            ThreatLevel::High | ThreatLevel::Critical => ThreatLevel::Critical,
        }
    }

    /// Multiplier applied to undercut risk scores
    pub fn risk_multiplier(&self) -> f64 {
        match self {
            ThreatLevel::Low => 0.5,
            ThreatLevel::Medium => 0.7,
            ThreatLevel::High => 0.9,
            ThreatLevel::Critical => 1.0,
        }
    }
}

impl std::fmt::Display for ThreatLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Predicted Strategy
// ============================================================================

/// Pit strategy inferred from a competitor's stop history
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum PredictedStrategy {
    OneStop,
    /// Prior before any stop has been observed
    #[default]
    TwoStop,
    ThreeStop,
    Unknown,
}

impl PredictedStrategy {
    /// First stop later than this lap implies a one-stop race
    pub const LATE_FIRST_STOP_LAP: u32 = 35;

    /// Re-derive the strategy from the number of stops so far and the lap
    /// of the most recent one.
    pub fn from_pit_history(stops: usize, last_stop_lap: u32) -> Self {
        match stops {
            0 => PredictedStrategy::TwoStop,
            1 if last_stop_lap > Self::LATE_FIRST_STOP_LAP => PredictedStrategy::OneStop,
            1 => PredictedStrategy::TwoStop,
            2 => PredictedStrategy::ThreeStop,
            _ => PredictedStrategy::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PredictedStrategy::OneStop => "one_stop",
            PredictedStrategy::TwoStop => "two_stop",
            PredictedStrategy::ThreeStop => "three_stop",
            PredictedStrategy::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PredictedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Behavioral Profile
// ============================================================================

/// Observed racing tendencies, each in [0, 1]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BehavioralProfile {
    pub undercut_tendency: f64,
    pub aggressive_defense: f64,
    pub tire_management: f64,
}

impl Default for BehavioralProfile {
    fn default() -> Self {
        Self {
            undercut_tendency: 0.5,
            aggressive_defense: 0.5,
            tire_management: 0.5,
        }
    }
}

impl BehavioralProfile {
    /// Exponential moving average of `current` toward `observed`, kept in [0, 1].
    ///
    /// Non-finite observations leave the current value untouched.
    pub fn blend(current: f64, observed: f64, keep: f64) -> f64 {
        if !observed.is_finite() {
            return current;
        }
        (current * keep + observed * (1.0 - keep)).clamp(0.0, 1.0)
    }

    /// Additive nudge kept in [0, 1]
    pub fn nudge(current: f64, delta: f64) -> f64 {
        (current + delta).clamp(0.0, 1.0)
    }
}

// ============================================================================
// Pit Stops
// ============================================================================

/// A pit stop inferred from a tire-age reset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PitStopRecord {
    pub lap: u32,
    pub timestamp: DateTime<Utc>,
    pub old_tire_compound: TireCompound,
    pub new_tire_compound: TireCompound,
    pub old_tire_age: u32,
    pub position_before: u32,
    pub position_after: u32,
}

impl PitStopRecord {
    /// Positions gained (negative) or lost (positive) across the stop
    pub fn position_change(&self) -> i64 {
        i64::from(self.position_after) - i64::from(self.position_before)
    }
}

/// How a stop played out against the field
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PitStopType {
    /// Gained positions across the stop
    Undercut,
    /// Lost more than two positions
    Overcut,
    Standard,
}

impl PitStopType {
    pub fn classify(stop: &PitStopRecord) -> Self {
        let change = stop.position_change();
        if change < 0 {
            PitStopType::Undercut
        } else if change > 2 {
            PitStopType::Overcut
        } else {
            PitStopType::Standard
        }
    }
}

/// Tire-strategy history entry recorded for every detected stop
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategyRecord {
    pub pit_lap: u32,
    pub strategy_type: PitStopType,
    pub tire_compound_choice: TireCompound,
}

// ============================================================================
// Strategic Opportunities
// ============================================================================

/// Kind of strategic opportunity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum OpportunityType {
    UndercutWindow,
    OvercutWindow,
    DrsOvertake,
    SafetyCarOpportunity,
    PitResponse,
    TrackPositionGain,
    RestartOpportunity,
}

impl OpportunityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::UndercutWindow => "undercut_window",
            OpportunityType::OvercutWindow => "overcut_window",
            OpportunityType::DrsOvertake => "drs_overtake",
            OpportunityType::SafetyCarOpportunity => "safety_car_opportunity",
            OpportunityType::PitResponse => "pit_response",
            OpportunityType::TrackPositionGain => "track_position_gain",
            OpportunityType::RestartOpportunity => "restart_opportunity",
        }
    }
}

impl std::fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Ranked, time-bounded strategic opportunity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StrategicOpportunity {
    #[serde(rename = "type")]
    pub opportunity_type: OpportunityType,
    /// Competitor car id, or `FIELD_TARGET`
    pub target_car: String,
    /// Probability in [0, 1]
    pub probability: f64,
    pub execution_lap: u32,
    pub reasoning: String,
    /// How long the opportunity stays open, for event-driven opportunities
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_laps: Option<u32>,
}

impl StrategicOpportunity {
    pub fn new(
        opportunity_type: OpportunityType,
        target_car: impl Into<String>,
        probability: f64,
        execution_lap: u32,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            opportunity_type,
            target_car: target_car.into(),
            probability: probability.clamp(0.0, 1.0),
            execution_lap,
            reasoning: reasoning.into(),
            duration_laps: None,
        }
    }

    pub fn with_duration(mut self, laps: u32) -> Self {
        self.duration_laps = Some(laps);
        self
    }

    /// True once the execution lap has passed
    pub fn is_stale(&self, current_lap: u32) -> bool {
        self.execution_lap < current_lap
    }
}
