//! On-demand analysis helpers
//!
//! Not called by `update_state`; external callers invoke them when a safety
//! car is deployed or a competitor pits. All are pure reads of the twin.

use serde::Serialize;

use super::field::FieldTwin;
use super::throttle::seconds;
use crate::types::{
    OpportunityType, PitStopRecord, RaceEventKind, RiskLevel, StrategicOpportunity, ThreatLevel,
    TrackStatus, FIELD_TARGET,
};

/// Tire age above which a car is expected to take a free stop
const OLD_TIRE_AGE: u32 = 15;

/// Tire age below which a car is expected to stay out
const FRESH_TIRE_AGE: u32 = 5;

// ============================================================================
// Safety Car
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitWindowAnalysis {
    pub free_pit_stop_available: bool,
    pub competitors_likely_to_pit: Vec<String>,
    pub competitors_likely_to_stay: Vec<String>,
    pub strategic_advantage: RiskLevel,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SafetyCarAnalysis {
    pub deployment_lap: u32,
    pub strategic_implications: Vec<String>,
    pub pit_window_analysis: PitWindowAnalysis,
    pub recommended_actions: Vec<String>,
}

// ============================================================================
// Competitor Pit Stop
// ============================================================================

/// Why a competitor most likely pitted, judged by the age of the old set
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PitStopCategory {
    /// Old set younger than 10 laps
    EarlyAggressive,
    /// Old set older than 20 laps
    ForcedDegradation,
    StrategicWindow,
}

impl PitStopCategory {
    pub fn from_old_tire_age(age: u32) -> Self {
        if age < 10 {
            PitStopCategory::EarlyAggressive
        } else if age > 20 {
            PitStopCategory::ForcedDegradation
        } else {
            PitStopCategory::StrategicWindow
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreatTrend {
    None,
    Increased,
    Decreased,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitStopAnalysis {
    pub car_id: String,
    pub pit_lap: u32,
    pub strategic_type: PitStopCategory,
    pub implications: Vec<String>,
    pub response_options: Vec<String>,
    pub threat_level_change: ThreatTrend,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

impl FieldTwin {
    /// Classify the field into tire-age cohorts under a safety car.
    pub fn handle_safety_car_deployment(&self) -> SafetyCarAnalysis {
        let mut likely_to_pit = Vec::new();
        let mut likely_to_stay = Vec::new();
        for c in self.competitors() {
            if c.tire_age() > OLD_TIRE_AGE {
                likely_to_pit.push(c.car_id().to_string());
            } else if c.tire_age() < FRESH_TIRE_AGE {
                likely_to_stay.push(c.car_id().to_string());
            }
        }

        let implication = if likely_to_pit.len() > likely_to_stay.len() {
            "Majority will pit - consider staying out for track position"
        } else {
            "Minority will pit - good opportunity for fresh tires"
        };
        let strategic_advantage = if likely_to_pit.len() > 3 {
            RiskLevel::High
        } else {
            RiskLevel::Medium
        };

        SafetyCarAnalysis {
            deployment_lap: self.race_context().current_lap,
            strategic_implications: vec![implication.to_string()],
            pit_window_analysis: PitWindowAnalysis {
                free_pit_stop_available: true,
                competitors_likely_to_pit: likely_to_pit,
                competitors_likely_to_stay: likely_to_stay,
                strategic_advantage,
            },
            recommended_actions: owned(&[
                "Evaluate tire condition vs field",
                "Consider fuel level for extended stint",
                "Prepare for restart positioning",
            ]),
        }
    }

    /// Classify a competitor's pit stop and list response options.
    ///
    /// Returns `None` for a car the twin has never seen.
    pub fn handle_competitor_pit_stop(&self, car_id: &str, pit: &PitStopRecord) -> Option<PitStopAnalysis> {
        let competitor = self.get_competitor(car_id)?;

        let strategic_type = PitStopCategory::from_old_tire_age(pit.old_tire_age);
        let mut implications = vec![match strategic_type {
            PitStopCategory::EarlyAggressive => "Aggressive undercut attempt".to_string(),
            PitStopCategory::ForcedDegradation => "Forced by tire degradation".to_string(),
            PitStopCategory::StrategicWindow => "Planned strategic pit stop".to_string(),
        }];

        let change = pit.position_change();
        let threat_level_change = if change < -1 {
            implications.push("Significant position gain - successful undercut".to_string());
            ThreatTrend::Increased
        } else if change > 2 {
            implications.push("Position loss - poor pit timing or execution".to_string());
            ThreatTrend::Decreased
        } else {
            ThreatTrend::None
        };

        let response_options = if competitor.threat_level() < ThreatLevel::Medium {
            Vec::new()
        } else if strategic_type == PitStopCategory::EarlyAggressive {
            owned(&[
                "Immediate counter-pit to cover undercut",
                "Extend stint for overcut opportunity",
                "Monitor tire degradation closely",
            ])
        } else {
            owned(&[
                "Continue current strategy",
                "Adjust pit window timing",
                "Prepare for restart battle",
            ])
        };

        Some(PitStopAnalysis {
            car_id: car_id.to_string(),
            pit_lap: pit.lap,
            strategic_type,
            implications,
            response_options,
            threat_level_change,
        })
    }

    /// Opportunities implied by race events inside the event window.
    pub fn detect_strategic_opportunities_from_events(&self) -> Vec<StrategicOpportunity> {
        let now = self.now();
        let window = seconds(self.config().event_opportunity_window_secs);
        let lap = self.race_context().current_lap;

        self.race_events()
            .iter()
            .filter(|e| now - e.timestamp < window)
            .filter_map(|e| match &e.kind {
                RaceEventKind::CompetitorPitStop { car_id, .. } if self.get_competitor(car_id).is_some() => {
                    Some(
                        StrategicOpportunity::new(
                            OpportunityType::TrackPositionGain,
                            car_id.as_str(),
                            0.8,
                            lap,
                            format!("Gained track position from {car_id} pit stop"),
                        )
                        .with_duration(5),
                    )
                }
                RaceEventKind::TrackStatusChange { old_status, new_status }
                    if *new_status == TrackStatus::Green && old_status.is_neutralized() =>
                {
                    Some(
                        StrategicOpportunity::new(
                            OpportunityType::RestartOpportunity,
                            FIELD_TARGET,
                            0.6,
                            lap,
                            "Race restart - positioning opportunity",
                        )
                        .with_duration(3),
                    )
                }
                _ => None,
            })
            .collect()
    }
}
