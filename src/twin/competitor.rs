//! Per-competitor rolling model
//!
//! One `CompetitorModel` per car id, created on first sighting and kept for the
//! whole session. Each telemetry update overwrites the live snapshot, feeds
//! the bounded histories, infers pit stops from tire-age resets and refreshes
//! the behavioral profile.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use tracing::info;

use crate::config::FieldTwinConfig;
use crate::types::{
    BehavioralProfile, CarSnapshot, PitStopRecord, PitStopType, PredictedStrategy, StrategyRecord,
    ThreatLevel, TireCompound,
};

// ============================================================================
// Constants
// ============================================================================

/// A tire-age reset only counts as a pit stop if the old set was older than this
pub const PIT_DETECTION_MIN_TIRE_AGE: u32 = 5;

/// Lap-time loss per lap of tire age (fraction)
pub const DEFAULT_DEGRADATION_RATE: f64 = 0.008;

/// Fuel burned per lap (percent of a full tank)
pub const DEFAULT_FUEL_CONSUMPTION_RATE: f64 = 2.1;

/// Strategy lap windows are defined for this race distance and scaled to others
pub const REFERENCE_RACE_LAPS: f64 = 50.0;

/// Lap-time history entries required before the profile is refreshed
const MIN_PROFILE_SAMPLES: usize = 5;

/// Window used for consistency and volatility measures
const PROFILE_WINDOW: usize = 10;

/// Fuel level below which pitting becomes urgent
const FUEL_URGENCY_LEVEL: f64 = 0.3;

// ============================================================================
// History
// ============================================================================

/// Ring-buffer capacities for the rolling histories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryLimits {
    pub lap_times: usize,
    pub positions: usize,
}

impl Default for HistoryLimits {
    fn default() -> Self {
        Self {
            lap_times: crate::config::defaults::LAP_HISTORY_LEN,
            positions: crate::config::defaults::POSITION_HISTORY_LEN,
        }
    }
}

impl From<&FieldTwinConfig> for HistoryLimits {
    fn from(config: &FieldTwinConfig) -> Self {
        Self {
            lap_times: config.lap_history_len.max(1),
            positions: config.position_history_len.max(1),
        }
    }
}

/// One completed lap
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LapSample {
    pub lap_time: f64,
    pub tire_age: u32,
    pub tire_compound: TireCompound,
    pub timestamp: DateTime<Utc>,
}

/// One observed race position
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionSample {
    pub position: u32,
    pub timestamp: DateTime<Utc>,
}

fn push_bounded<T>(buf: &mut VecDeque<T>, item: T, cap: usize) {
    while buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(item);
}

// ============================================================================
// Pit Probability
// ============================================================================

/// Factors behind a pit-probability estimate
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct PitProbabilityBreakdown {
    pub tire_factor: f64,
    pub strategy_factor: f64,
    pub fuel_factor: f64,
    pub probability: f64,
}

/// Map a race lap onto the reference race distance
pub(crate) fn normalized_lap(lap: u32, total_laps: u32) -> f64 {
    if total_laps == 0 {
        return f64::from(lap);
    }
    f64::from(lap) * REFERENCE_RACE_LAPS / f64::from(total_laps)
}

// ============================================================================
// Competitor Model
// ============================================================================

#[derive(Debug, Clone)]
pub struct CompetitorModel {
    car_id: String,
    team: String,
    driver: String,

    position: u32,
    gap_to_leader: f64,
    speed: f64,
    tire_compound: TireCompound,
    tire_age: u32,
    tire_wear: f64,
    fuel_level: f64,
    last_lap_time: f64,

    pit_stops: Vec<PitStopRecord>,
    strategy_history: Vec<StrategyRecord>,
    predicted_strategy: PredictedStrategy,
    behavioral_profile: BehavioralProfile,

    lap_times_history: VecDeque<LapSample>,
    position_history: VecDeque<PositionSample>,
    limits: HistoryLimits,

    performance_baseline: f64,
    degradation_rate: f64,
    fuel_consumption_rate: f64,

    pit_probability: f64,
    strategic_threat_level: ThreatLevel,
    last_update: Option<DateTime<Utc>>,
}

impl CompetitorModel {
    pub fn new(car_id: &str, team: &str, driver: &str, limits: HistoryLimits) -> Self {
        Self {
            car_id: car_id.to_string(),
            team: team.to_string(),
            driver: driver.to_string(),
            position: 0,
            gap_to_leader: 0.0,
            speed: 0.0,
            tire_compound: TireCompound::default(),
            tire_age: 0,
            tire_wear: 0.0,
            fuel_level: 1.0,
            last_lap_time: 0.0,
            pit_stops: Vec::new(),
            strategy_history: Vec::new(),
            predicted_strategy: PredictedStrategy::default(),
            behavioral_profile: BehavioralProfile::default(),
            lap_times_history: VecDeque::with_capacity(limits.lap_times),
            position_history: VecDeque::with_capacity(limits.positions),
            limits,
            performance_baseline: 0.0,
            degradation_rate: DEFAULT_DEGRADATION_RATE,
            fuel_consumption_rate: DEFAULT_FUEL_CONSUMPTION_RATE,
            pit_probability: 0.0,
            strategic_threat_level: ThreatLevel::Medium,
            last_update: None,
        }
    }

    /// Model seeded with a snapshot's identity (missing names become "Unknown")
    pub fn from_snapshot(snapshot: &CarSnapshot, limits: HistoryLimits) -> Self {
        Self::new(
            &snapshot.car_id,
            snapshot.team.as_deref().unwrap_or("Unknown"),
            snapshot.driver.as_deref().unwrap_or("Unknown"),
            limits,
        )
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Fold one telemetry snapshot into the model.
    ///
    /// Missing fields keep their previous values. Never fails.
    pub fn update_state(&mut self, snapshot: &CarSnapshot, lap: u32, now: DateTime<Utc>) {
        let previous_age = self.tire_age;
        let previous_compound = self.tire_compound;
        let previous_position = self.position;

        if let Some(position) = snapshot.position {
            self.position = position;
        }
        if let Some(speed) = snapshot.speed.filter(|v| v.is_finite()) {
            self.speed = speed;
        }
        if let Some(lap_time) = snapshot.lap_time.filter(|v| v.is_finite()) {
            self.last_lap_time = lap_time;
        }
        if let Some(compound) = snapshot.tire.compound {
            self.tire_compound = compound;
        }
        if let Some(age) = snapshot.tire.age {
            self.tire_age = age;
        }
        if let Some(wear) = snapshot.tire.wear_level.filter(|v| v.is_finite()) {
            self.tire_wear = wear.clamp(0.0, 1.0);
        }
        if let Some(fuel) = snapshot.fuel_level.filter(|v| v.is_finite()) {
            self.fuel_level = fuel.clamp(0.0, 1.0);
        }

        if self.last_lap_time > 0.0 {
            push_bounded(
                &mut self.lap_times_history,
                LapSample {
                    lap_time: self.last_lap_time,
                    tire_age: self.tire_age,
                    tire_compound: self.tire_compound,
                    timestamp: now,
                },
                self.limits.lap_times,
            );
            self.performance_baseline = self.lap_times_history.iter().map(|s| s.lap_time).sum::<f64>()
                / self.lap_times_history.len() as f64;
        }

        push_bounded(
            &mut self.position_history,
            PositionSample {
                position: self.position,
                timestamp: now,
            },
            self.limits.positions,
        );

        if self.tire_age < previous_age && previous_age > PIT_DETECTION_MIN_TIRE_AGE {
            let stop = PitStopRecord {
                lap,
                timestamp: now,
                old_tire_compound: previous_compound,
                new_tire_compound: snapshot.tire.compound.unwrap_or_default(),
                old_tire_age: previous_age,
                position_before: previous_position,
                position_after: self.position,
            };
            self.record_pit_stop(stop);
        }

        self.refresh_behavioral_profile();
        self.last_update = Some(now);
    }

    fn record_pit_stop(&mut self, stop: PitStopRecord) {
        let stop_type = PitStopType::classify(&stop);
        if stop_type == PitStopType::Undercut {
            self.behavioral_profile.undercut_tendency =
                BehavioralProfile::nudge(self.behavioral_profile.undercut_tendency, 0.1);
        }

        self.strategy_history.push(StrategyRecord {
            pit_lap: stop.lap,
            strategy_type: stop_type,
            tire_compound_choice: stop.new_tire_compound,
        });

        let lap = stop.lap;
        info!(
            car_id = %self.car_id,
            lap,
            old_tire_age = stop.old_tire_age,
            new_compound = %stop.new_tire_compound,
            stop_type = ?stop_type,
            "Pit stop detected"
        );
        self.pit_stops.push(stop);
        self.predicted_strategy = PredictedStrategy::from_pit_history(self.pit_stops.len(), lap);
    }

    fn refresh_behavioral_profile(&mut self) {
        if self.lap_times_history.len() < MIN_PROFILE_SAMPLES {
            return;
        }

        let recent: Vec<f64> = self
            .lap_times_history
            .iter()
            .rev()
            .take(PROFILE_WINDOW)
            .map(|s| s.lap_time)
            .collect();
        let max = recent.iter().copied().fold(f64::MIN, f64::max);
        let min = recent.iter().copied().fold(f64::MAX, f64::min);
        let consistency = (1.0 - (max - min) / 5.0).max(0.0);
        self.behavioral_profile.tire_management =
            BehavioralProfile::blend(self.behavioral_profile.tire_management, consistency, 0.8);

        if self.position_history.len() >= PROFILE_WINDOW {
            let skip = self.position_history.len() - PROFILE_WINDOW;
            let positions: Vec<u32> =
                self.position_history.iter().skip(skip).map(|s| s.position).collect();
            let total: u32 = positions.windows(2).map(|w| w[0].abs_diff(w[1])).sum();
            let avg = f64::from(total) / (positions.len() - 1) as f64;
            let aggression = (avg / 2.0).min(1.0);
            self.behavioral_profile.aggressive_defense =
                BehavioralProfile::blend(self.behavioral_profile.aggressive_defense, aggression, 0.9);
        }
    }

    // ========================================================================
    // Strategic Assessment
    // ========================================================================

    /// Pit probability from the current fields, without storing it.
    pub fn estimate_pit_probability(&self, current_lap: u32, total_laps: u32) -> PitProbabilityBreakdown {
        let tire_factor = (f64::from(self.tire_age) / 25.0 + self.tire_wear * 0.5).min(1.0);

        let lap = normalized_lap(current_lap, total_laps);
        let stops = self.pit_stops.len();
        let strategy_factor = match (self.predicted_strategy, stops) {
            (PredictedStrategy::TwoStop, 0) if (15.0..26.0).contains(&lap) => 0.7,
            (PredictedStrategy::TwoStop, 0) if (26.0..36.0).contains(&lap) => 0.4,
            (PredictedStrategy::TwoStop, 1) if (35.0..46.0).contains(&lap) => 0.8,
            (PredictedStrategy::OneStop, 0) if (25.0..41.0).contains(&lap) => 0.6,
            _ => 0.0,
        };

        let fuel_factor = (1.0 - self.fuel_level / FUEL_URGENCY_LEVEL).max(0.0);

        let weighted = tire_factor * 0.4 + strategy_factor * 0.4 + fuel_factor * 0.2;
        // Fuel urgency alone can force a stop regardless of tires or strategy
        let probability = weighted.max(fuel_factor).clamp(0.0, 1.0);

        PitProbabilityBreakdown {
            tire_factor,
            strategy_factor,
            fuel_factor,
            probability,
        }
    }

    /// Recompute and store the probability of pitting within the next few laps.
    pub fn calculate_pit_probability(&mut self, current_lap: u32, total_laps: u32) -> f64 {
        self.pit_probability = self.estimate_pit_probability(current_lap, total_laps).probability;
        self.pit_probability
    }

    /// Threat level from the current fields, without storing it.
    ///
    /// `our_gap` is this car's gap to the leader minus ours.
    pub fn evaluate_threat(&self, our_position: u32, our_gap: f64) -> ThreatLevel {
        let position_diff = self.position.abs_diff(our_position);
        let gap = our_gap.abs();

        let threat = if position_diff > 3 {
            ThreatLevel::Low
        } else if position_diff > 1 {
            ThreatLevel::Medium
        } else if gap < 5.0 {
            if self.pit_probability > 0.6 || self.behavioral_profile.undercut_tendency > 0.7 {
                ThreatLevel::High
            } else {
                ThreatLevel::Medium
            }
        } else if gap < 15.0 {
            ThreatLevel::Medium
        } else {
            ThreatLevel::Low
        };

        if self.tire_age < PIT_DETECTION_MIN_TIRE_AGE {
            threat.escalate()
        } else {
            threat
        }
    }

    /// Recompute and store the strategic threat this car poses to ours.
    pub fn assess_strategic_threat(&mut self, our_position: u32, our_gap: f64) -> ThreatLevel {
        self.strategic_threat_level = self.evaluate_threat(our_position, our_gap);
        self.strategic_threat_level
    }

    pub(crate) fn set_gap_to_leader(&mut self, gap: f64) {
        self.gap_to_leader = gap;
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn car_id(&self) -> &str {
        &self.car_id
    }

    pub fn team(&self) -> &str {
        &self.team
    }

    pub fn driver(&self) -> &str {
        &self.driver
    }

    pub fn position(&self) -> u32 {
        self.position
    }

    pub fn gap_to_leader(&self) -> f64 {
        self.gap_to_leader
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn tire_compound(&self) -> TireCompound {
        self.tire_compound
    }

    pub fn tire_age(&self) -> u32 {
        self.tire_age
    }

    pub fn tire_wear(&self) -> f64 {
        self.tire_wear
    }

    pub fn fuel_level(&self) -> f64 {
        self.fuel_level
    }

    pub fn last_lap_time(&self) -> f64 {
        self.last_lap_time
    }

    pub fn pit_stops(&self) -> &[PitStopRecord] {
        &self.pit_stops
    }

    pub fn last_pit_stop(&self) -> Option<&PitStopRecord> {
        self.pit_stops.last()
    }

    pub fn strategy_history(&self) -> &[StrategyRecord] {
        &self.strategy_history
    }

    pub fn predicted_strategy(&self) -> PredictedStrategy {
        self.predicted_strategy
    }

    pub fn behavioral_profile(&self) -> &BehavioralProfile {
        &self.behavioral_profile
    }

    pub fn lap_times_history(&self) -> &VecDeque<LapSample> {
        &self.lap_times_history
    }

    pub fn position_history(&self) -> &VecDeque<PositionSample> {
        &self.position_history
    }

    pub fn pit_probability(&self) -> f64 {
        self.pit_probability
    }

    pub fn threat_level(&self) -> ThreatLevel {
        self.strategic_threat_level
    }

    pub fn degradation_rate(&self) -> f64 {
        self.degradation_rate
    }

    /// Percent of a full tank per lap
    pub fn fuel_consumption_rate(&self) -> f64 {
        self.fuel_consumption_rate
    }

    /// Fraction of a full tank per lap
    pub fn fuel_per_lap(&self) -> f64 {
        self.fuel_consumption_rate / 100.0
    }

    pub fn performance_baseline(&self) -> f64 {
        self.performance_baseline
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    /// Exported view
    pub fn state(&self) -> CompetitorState {
        CompetitorState {
            car_id: self.car_id.clone(),
            team: self.team.clone(),
            driver: self.driver.clone(),
            current_position: self.position,
            gap_to_leader: self.gap_to_leader,
            predicted_strategy: self.predicted_strategy,
            pit_probability: self.pit_probability,
            strategic_threat_level: self.strategic_threat_level,
            behavioral_profile: self.behavioral_profile,
            current_state: LiveState {
                speed: self.speed,
                tire_compound: self.tire_compound,
                tire_age: self.tire_age,
                tire_wear: self.tire_wear,
                fuel_level: self.fuel_level,
                last_lap_time: self.last_lap_time,
            },
            pit_stops_count: self.pit_stops.len(),
            strategy_history: self.strategy_history.clone(),
            performance_metrics: CompetitorPerformance {
                degradation_rate: self.degradation_rate,
                fuel_consumption_rate: self.fuel_consumption_rate,
                performance_baseline: self.performance_baseline,
            },
        }
    }
}

// ============================================================================
// Exported State
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LiveState {
    pub speed: f64,
    pub tire_compound: TireCompound,
    pub tire_age: u32,
    pub tire_wear: f64,
    pub fuel_level: f64,
    pub last_lap_time: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorPerformance {
    pub degradation_rate: f64,
    pub fuel_consumption_rate: f64,
    pub performance_baseline: f64,
}

/// Serializable per-competitor state
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorState {
    pub car_id: String,
    pub team: String,
    pub driver: String,
    pub current_position: u32,
    pub gap_to_leader: f64,
    pub predicted_strategy: PredictedStrategy,
    pub pit_probability: f64,
    pub strategic_threat_level: ThreatLevel,
    pub behavioral_profile: BehavioralProfile,
    pub current_state: LiveState,
    pub pit_stops_count: usize,
    pub strategy_history: Vec<StrategyRecord>,
    pub performance_metrics: CompetitorPerformance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TireSnapshot;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().expect("valid timestamp")
    }

    fn snapshot(position: u32, tire_age: u32, lap_time: f64) -> CarSnapshot {
        CarSnapshot {
            car_id: "33".to_string(),
            team: Some("Red Bull".to_string()),
            driver: Some("Verstappen".to_string()),
            position: Some(position),
            speed: Some(290.0),
            tire: TireSnapshot {
                compound: Some(TireCompound::Medium),
                age: Some(tire_age),
                wear_level: Some(0.2),
            },
            fuel_level: Some(0.6),
            lap_time: Some(lap_time),
            sector_times: None,
        }
    }

    fn model() -> CompetitorModel {
        CompetitorModel::new("33", "Red Bull", "Verstappen", HistoryLimits::default())
    }

    #[test]
    fn missing_fields_keep_previous_values() {
        let mut m = model();
        m.update_state(&snapshot(4, 10, 84.0), 10, t0());

        let sparse = CarSnapshot {
            car_id: "33".to_string(),
            ..Default::default()
        };
        m.update_state(&sparse, 11, t0());

        assert_eq!(m.position(), 4);
        assert_eq!(m.tire_age(), 10);
        assert_eq!(m.last_lap_time(), 84.0);
        assert_eq!(m.fuel_level(), 0.6);
    }

    #[test]
    fn histories_stay_bounded() {
        let mut m = model();
        for lap in 0..120 {
            m.update_state(&snapshot(5, lap % 5, 84.0), lap, t0());
        }
        assert_eq!(m.lap_times_history().len(), 20);
        assert_eq!(m.position_history().len(), 50);
    }

    #[test]
    fn zero_lap_time_is_not_recorded() {
        let mut m = model();
        m.update_state(&snapshot(5, 3, 0.0), 1, t0());
        assert!(m.lap_times_history().is_empty());
        assert_eq!(m.position_history().len(), 1);
    }

    #[test]
    fn tire_reset_records_single_pit_stop() {
        let mut m = model();
        m.update_state(&snapshot(3, 18, 84.0), 20, t0());
        m.update_state(&snapshot(5, 0, 104.0), 21, t0());

        assert_eq!(m.pit_stops().len(), 1);
        let stop = &m.pit_stops()[0];
        assert_eq!(stop.lap, 21);
        assert_eq!(stop.old_tire_age, 18);
        assert_eq!(stop.position_before, 3);
        assert_eq!(stop.position_after, 5);
        assert_eq!(m.predicted_strategy(), PredictedStrategy::TwoStop);
        assert_eq!(m.strategy_history().len(), 1);

        // Next lap on the new set must not count again
        m.update_state(&snapshot(5, 1, 83.0), 22, t0());
        assert_eq!(m.pit_stops().len(), 1);
    }

    #[test]
    fn early_tire_reset_is_not_a_pit_stop() {
        let mut m = model();
        m.update_state(&snapshot(3, 5, 84.0), 5, t0());
        m.update_state(&snapshot(3, 0, 84.0), 6, t0());
        assert!(m.pit_stops().is_empty());
    }

    #[test]
    fn late_first_stop_implies_one_stop() {
        let mut m = model();
        m.update_state(&snapshot(3, 36, 84.0), 37, t0());
        m.update_state(&snapshot(3, 0, 84.0), 38, t0());
        assert_eq!(m.predicted_strategy(), PredictedStrategy::OneStop);
    }

    #[test]
    fn undercut_stop_nudges_tendency() {
        let mut m = model();
        m.update_state(&snapshot(6, 20, 84.0), 20, t0());
        m.update_state(&snapshot(4, 0, 84.0), 21, t0());
        assert!((m.behavioral_profile().undercut_tendency - 0.6).abs() < 1e-9);
        assert_eq!(m.strategy_history()[0].strategy_type, PitStopType::Undercut);
    }

    #[test]
    fn consistent_laps_raise_tire_management() {
        let mut m = model();
        for lap in 1..=10 {
            m.update_state(&snapshot(5, lap, 84.0), lap, t0());
        }
        assert!(m.behavioral_profile().tire_management > 0.5);
    }

    #[test]
    fn volatile_positions_raise_aggression() {
        let mut m = model();
        for lap in 1..=12 {
            let position = if lap % 2 == 0 { 3 } else { 7 };
            m.update_state(&snapshot(position, lap, 84.0), lap, t0());
        }
        assert!(m.behavioral_profile().aggressive_defense > 0.5);
        let p = m.behavioral_profile();
        for v in [p.undercut_tendency, p.aggressive_defense, p.tire_management] {
            assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn low_fuel_dominates_pit_probability() {
        let mut m = model();
        let mut s = snapshot(5, 2, 84.0);
        s.fuel_level = Some(0.05);
        s.tire.wear_level = Some(0.0);
        m.update_state(&s, 5, t0());
        let p = m.calculate_pit_probability(5, 50);
        assert!(p >= 0.6, "fuel-critical probability was {p}");
        assert_eq!(m.pit_probability(), p);
    }

    #[test]
    fn two_stop_window_raises_probability() {
        let mut m = model();
        m.update_state(&snapshot(5, 10, 84.0), 20, t0());
        let inside = m.estimate_pit_probability(20, 50);
        let outside = m.estimate_pit_probability(5, 50);
        assert_eq!(inside.strategy_factor, 0.7);
        assert_eq!(outside.strategy_factor, 0.0);
        assert!(inside.probability > outside.probability);
    }

    #[test]
    fn strategy_windows_scale_with_race_distance() {
        let mut m = model();
        m.update_state(&snapshot(5, 10, 84.0), 40, t0());
        // Lap 40 of 100 is lap 20 of the reference race
        assert_eq!(m.estimate_pit_probability(40, 100).strategy_factor, 0.7);
    }

    #[test]
    fn threat_from_position_distance() {
        let mut m = model();
        m.update_state(&snapshot(10, 12, 84.0), 10, t0());
        assert_eq!(m.assess_strategic_threat(3, 0.0), ThreatLevel::Low);
        assert_eq!(m.assess_strategic_threat(8, 0.0), ThreatLevel::Medium);
        assert_eq!(m.assess_strategic_threat(9, 20.0), ThreatLevel::Low);
        assert_eq!(m.assess_strategic_threat(9, 10.0), ThreatLevel::Medium);
    }

    #[test]
    fn close_car_likely_to_pit_is_high_threat() {
        let mut m = model();
        let mut s = snapshot(4, 24, 84.0);
        s.tire.wear_level = Some(0.8);
        m.update_state(&s, 20, t0());
        m.calculate_pit_probability(20, 50);
        assert!(m.pit_probability() > 0.6);
        assert_eq!(m.assess_strategic_threat(3, 1.5), ThreatLevel::High);
    }

    #[test]
    fn fresh_tires_escalate_threat() {
        let mut m = model();
        m.update_state(&snapshot(10, 2, 84.0), 10, t0());
        assert_eq!(m.assess_strategic_threat(3, 0.0), ThreatLevel::Medium);
        assert_eq!(m.assess_strategic_threat(8, 0.0), ThreatLevel::High);
    }

    #[test]
    fn exported_state_reflects_model() {
        let mut m = model();
        m.update_state(&snapshot(2, 8, 83.5), 8, t0());
        m.set_gap_to_leader(1.5);
        let state = m.state();
        assert_eq!(state.car_id, "33");
        assert_eq!(state.current_position, 2);
        assert_eq!(state.gap_to_leader, 1.5);
        assert_eq!(state.current_state.tire_age, 8);
        assert_eq!(state.performance_metrics.performance_baseline, 83.5);
        assert_eq!(state.pit_stops_count, 0);
    }
}
