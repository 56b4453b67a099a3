//! Race-situation summary: phase, complexity, key factors and dynamics

use serde::Serialize;
use std::collections::HashSet;

use super::threats::ThreatAssessment;
use crate::twin::{seconds, FieldTwin};
use crate::types::{ThreatLevel, TrackStatus};

/// Pit stops younger than this count as recent strategic activity (seconds)
const RECENT_PIT_SECS: u64 = 300;

/// Gap (seconds) under which a competitor adds competitive pressure
const PRESSURE_GAP_SECS: f64 = 10.0;

/// Position samples per competitor used for volatility
const VOLATILITY_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RacePhase {
    Opening,
    Middle,
    Closing,
}

impl RacePhase {
    pub fn from_progress(progress: f64) -> Self {
        if progress < 0.3 {
            RacePhase::Opening
        } else if progress < 0.7 {
            RacePhase::Middle
        } else {
            RacePhase::Closing
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum StrategicComplexity {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl StrategicComplexity {
    /// Opportunities count once, high or critical threats twice.
    pub fn from_counts(opportunities: usize, high_threats: usize) -> Self {
        match opportunities + high_threats * 2 {
            n if n >= 8 => StrategicComplexity::VeryHigh,
            n if n >= 5 => StrategicComplexity::High,
            n if n >= 3 => StrategicComplexity::Medium,
            _ => StrategicComplexity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct RaceDynamics {
    pub position_volatility: f64,
    pub strategic_activity: f64,
    pub competitive_pressure: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RaceSituation {
    pub current_lap: u32,
    pub total_laps: u32,
    pub race_phase: RacePhase,
    pub track_status: TrackStatus,
    pub strategic_complexity: StrategicComplexity,
    pub key_factors: Vec<String>,
    pub race_dynamics: RaceDynamics,
}

impl RaceSituation {
    pub fn assess(twin: &FieldTwin, threats: &ThreatAssessment) -> Self {
        let ctx = twin.race_context();
        Self {
            current_lap: ctx.current_lap,
            total_laps: ctx.total_laps,
            race_phase: RacePhase::from_progress(ctx.progress()),
            track_status: ctx.track_status,
            strategic_complexity: StrategicComplexity::from_counts(
                twin.strategic_opportunities().len(),
                threats.high_threat_count(),
            ),
            key_factors: key_factors(twin),
            race_dynamics: race_dynamics(twin),
        }
    }
}

pub fn key_factors(twin: &FieldTwin) -> Vec<String> {
    let competitors = twin.competitors();
    let mut factors = Vec::new();

    let status = twin.race_context().track_status;
    if status != TrackStatus::Green {
        factors.push(format!("track_status_{status}"));
    }
    if competitors.iter().filter(|c| c.pit_probability() > 0.6).count() >= 3 {
        factors.push("active_pit_window".to_string());
    }
    if competitors.iter().filter(|c| c.threat_level() >= ThreatLevel::High).count() >= 2 {
        factors.push("multiple_strategic_threats".to_string());
    }
    let strategies: HashSet<_> = competitors.iter().map(|c| c.predicted_strategy()).collect();
    if strategies.len() >= 3 {
        factors.push("diverse_tire_strategies".to_string());
    }

    factors
}

pub fn race_dynamics(twin: &FieldTwin) -> RaceDynamics {
    let competitors = twin.competitors();
    if competitors.is_empty() {
        return RaceDynamics::default();
    }

    let changes: usize = competitors
        .iter()
        .map(|c| {
            let recent: Vec<u32> = c
                .position_history()
                .iter()
                .rev()
                .take(VOLATILITY_WINDOW)
                .map(|s| s.position)
                .collect();
            recent.windows(2).filter(|w| w[0] != w[1]).count()
        })
        .sum();
    let position_volatility = (changes as f64 / (competitors.len() * 2) as f64).min(1.0);

    let now = twin.now();
    let recency = seconds(RECENT_PIT_SECS);
    let recent_pits = competitors
        .iter()
        .filter(|c| c.last_pit_stop().is_some_and(|p| now - p.timestamp < recency))
        .count();
    let likely_pitters = competitors.iter().filter(|c| c.pit_probability() > 0.5).count();
    let strategic_activity = (recent_pits as f64 * 0.3 + likely_pitters as f64 * 0.1).min(1.0);

    let our_gap = twin.race_context().our_gap_to_leader;
    let close = competitors
        .iter()
        .filter(|c| (c.gap_to_leader() - our_gap).abs() < PRESSURE_GAP_SECS)
        .count();
    let threat_score: f64 = competitors.iter().map(|c| threat_weight(c.threat_level())).sum();
    let competitive_pressure = (close as f64 * 0.1 + threat_score * 0.1).min(1.0);

    RaceDynamics {
        position_volatility,
        strategic_activity,
        competitive_pressure,
    }
}

fn threat_weight(level: ThreatLevel) -> f64 {
    match level {
        ThreatLevel::Low => 0.1,
        ThreatLevel::Medium => 0.3,
        ThreatLevel::High => 0.6,
        ThreatLevel::Critical => 1.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_boundaries() {
        assert_eq!(RacePhase::from_progress(0.0), RacePhase::Opening);
        assert_eq!(RacePhase::from_progress(0.29), RacePhase::Opening);
        assert_eq!(RacePhase::from_progress(0.3), RacePhase::Middle);
        assert_eq!(RacePhase::from_progress(0.69), RacePhase::Middle);
        assert_eq!(RacePhase::from_progress(0.7), RacePhase::Closing);
        assert_eq!(RacePhase::from_progress(1.2), RacePhase::Closing);
    }

    #[test]
    fn complexity_weights_threats_double() {
        assert_eq!(StrategicComplexity::from_counts(0, 0), StrategicComplexity::Low);
        assert_eq!(StrategicComplexity::from_counts(1, 1), StrategicComplexity::Medium);
        assert_eq!(StrategicComplexity::from_counts(5, 0), StrategicComplexity::High);
        assert_eq!(StrategicComplexity::from_counts(2, 3), StrategicComplexity::VeryHigh);
    }

    #[test]
    fn threat_weights_increase_with_level() {
        let levels = [ThreatLevel::Low, ThreatLevel::Medium, ThreatLevel::High, ThreatLevel::Critical];
        assert!(levels.windows(2).all(|w| threat_weight(w[0]) < threat_weight(w[1])));
    }
}
