//! Multi-lap predictions
//!
//! `FieldTwin::predict` projects every competitor forward by
//! `horizon_seconds / 90` laps and derives field-level windows, race-event
//! predictions, opportunity forecasts and a risk assessment. Everything is a
//! deterministic function of the current twin state.
//!
//! ## Lookahead
//!
//! | Forecast            | Max laps |
//! |---------------------|----------|
//! | Pit timing          | 19       |
//! | Performance         | 14       |
//! | Mass-pit windows    | 14       |
//! | Lap-time evolution  | 9        |
//! | Undercut likelihood | 9        |

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::Range;

use super::competitor::{normalized_lap, CompetitorModel};
use super::field::FieldTwin;
use crate::types::{
    OpportunityType, PredictedStrategy, RiskLevel, StrategicOpportunity, ThreatLevel,
};

// ============================================================================
// Constants
// ============================================================================

/// Assumed lap duration for converting horizons to laps (seconds)
pub const SECONDS_PER_LAP: u64 = 90;

/// Lap time assumed for a car that has not completed a timed lap (seconds)
pub const DEFAULT_LAP_TIME: f64 = 85.0;

/// Fuel level treated as the forced-stop floor
pub const FUEL_CRITICAL_LEVEL: f64 = 0.05;

/// At or below this fuel level the car is already critical
const FUEL_ALREADY_CRITICAL: f64 = 0.1;

/// Fuel level below which a forecast lap becomes pit-urgent
const FORECAST_FUEL_URGENCY: f64 = 0.2;

/// Strategy we assume for our own car when judging isolation
const OUR_ASSUMED_STRATEGY: PredictedStrategy = PredictedStrategy::TwoStop;

// Exclusive lookahead bounds (offsets run from 1 up to, not including, these)
const PIT_LOOKAHEAD: u32 = 20;
const PERFORMANCE_LOOKAHEAD: u32 = 15;
const WINDOW_LOOKAHEAD: u32 = 15;
const LAP_TIME_LOOKAHEAD: u32 = 10;
const BEHAVIOR_LOOKAHEAD: u32 = 10;

const MAX_PIT_WINDOWS: usize = 5;
const MAX_STRATEGIC_WINDOWS: usize = 10;

fn offsets(future_laps: u32, bound: u32) -> Range<u32> {
    1..future_laps.saturating_add(1).min(bound)
}

// ============================================================================
// Per-Competitor Forecasts
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PitFactor {
    Tire,
    Strategy,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitWindow {
    pub lap: u32,
    pub probability: f64,
    pub tire_age: u32,
    pub fuel_level: f64,
    pub primary_factor: PitFactor,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitTimingForecast {
    pub most_likely_lap: Option<u32>,
    pub highest_probability: f64,
    /// Best windows by probability
    pub pit_windows: Vec<PitWindow>,
    pub strategy_confidence: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LapTimePoint {
    pub lap_offset: u32,
    pub predicted_lap_time: f64,
    pub tire_age: u32,
    pub degradation_impact: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformancePoint {
    pub lap_offset: u32,
    pub predicted_lap_time: f64,
    pub degradation_impact: f64,
    pub fuel_benefit: f64,
    pub relative_performance: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PerformanceForecast {
    pub base_performance: f64,
    pub evolution: Vec<PerformancePoint>,
    /// Lap offset with the fastest predicted lap, 0 when nothing is forecast
    pub peak_performance_lap: u32,
    pub degradation_trend: f64,
    pub tire_management_factor: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UndercutLikelihood {
    pub lap: u32,
    pub probability: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DefensiveAction {
    pub action: String,
    pub probability: f64,
    pub triggers: Vec<String>,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ResponsePattern {
    pub trigger: String,
    pub response: String,
    pub probability: f64,
    pub effectiveness: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BehaviorForecast {
    pub undercut_likelihood: Vec<UndercutLikelihood>,
    pub defensive_actions: Vec<DefensiveAction>,
    pub strategic_responses: Vec<ResponsePattern>,
    pub risk_taking_tendency: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PositionTrend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionForecast {
    pub position_volatility: f64,
    pub likely_position_range: [u32; 2],
    pub position_trend: PositionTrend,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ThreatOutlook {
    ThreatIncreasePrePit,
    ThreatDecreasePostPit,
    ThreatDecreaseDegradation,
    ThreatStable,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CompetitorPrediction {
    pub predicted_lap_time: f64,
    pub lap_time_evolution: Vec<LapTimePoint>,
    pub degradation_factor: f64,
    pub predicted_fuel_level: f64,
    pub fuel_critical_lap: Option<u32>,
    pub pit_prediction: PitTimingForecast,
    pub performance_prediction: PerformanceForecast,
    pub strategic_behavior: BehaviorForecast,
    pub position_prediction: PositionForecast,
    pub threat_level_evolution: Vec<ThreatOutlook>,
}

// ============================================================================
// Field-Level Forecasts
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PitCandidate {
    pub car_id: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionComplexity {
    Low,
    Medium,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WindowKind {
    MassPitWindow {
        opportunity_type: OpportunityType,
        affected_competitors: Vec<PitCandidate>,
    },
    UndercutWindow {
        target_competitor: String,
        success_probability: f64,
    },
    OvercutWindow {
        target_competitor: String,
        success_probability: f64,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategicWindow {
    pub lap: u32,
    pub strategic_value: f64,
    pub execution_complexity: ExecutionComplexity,
    #[serde(flatten)]
    pub kind: WindowKind,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PredictedEventKind {
    PitStopWave {
        lap: u32,
        affected_cars: Vec<String>,
    },
    PositionBattle {
        lap_range: [u32; 2],
        involved_cars: Vec<String>,
        drs_factor: bool,
    },
    FuelCritical {
        lap: u32,
        car_id: String,
        forced_pit_stop: bool,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RaceEventPrediction {
    pub probability: f64,
    pub strategic_impact: RiskLevel,
    #[serde(flatten)]
    pub kind: PredictedEventKind,
}

impl RaceEventPrediction {
    /// First lap the prediction concerns
    pub fn lap(&self) -> u32 {
        match &self.kind {
            PredictedEventKind::PitStopWave { lap, .. } | PredictedEventKind::FuelCritical { lap, .. } => *lap,
            PredictedEventKind::PositionBattle { lap_range, .. } => lap_range[0],
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuccessFactors {
    pub tire_advantage: f64,
    pub position_advantage: f64,
    pub timing_advantage: f64,
    pub behavioral_factor: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OpportunityOutcome {
    pub success_probability: f64,
    pub position_gain_expected: u32,
    pub time_advantage_expected: f64,
    pub risk_factors: Vec<String>,
    pub success_scenarios: Vec<String>,
    pub failure_scenarios: Vec<String>,
}

/// A current opportunity that executes within the horizon.
///
/// Factors and outcome are absent for field-wide targets.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OpportunityForecast {
    pub opportunity: StrategicOpportunity,
    pub time_to_execution_secs: i64,
    pub success_factors: Option<SuccessFactors>,
    pub predicted_outcome: Option<OpportunityOutcome>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UndercutRisk {
    pub car_id: String,
    pub risk_score: f64,
    pub likely_execution_lap: u32,
    pub mitigation_window: [u32; 2],
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PositionLossRisk {
    pub car_id: String,
    pub risk_type: String,
    pub risk_score: f64,
    pub mitigation_actions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RiskAssessment {
    pub undercut_risks: Vec<UndercutRisk>,
    pub position_loss_risks: Vec<PositionLossRisk>,
    pub strategic_isolation_risk: f64,
    pub overall_risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldPredictions {
    pub twin_id: String,
    pub timestamp: DateTime<Utc>,
    pub horizon_seconds: u64,
    pub future_laps: u32,
    pub competitor_predictions: BTreeMap<String, CompetitorPrediction>,
    pub strategic_windows: Vec<StrategicWindow>,
    pub race_event_predictions: Vec<RaceEventPrediction>,
    pub strategic_forecast: Vec<OpportunityForecast>,
    pub risk_assessment: RiskAssessment,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

// ============================================================================
// Prediction Engine
// ============================================================================

impl FieldTwin {
    /// Forecast the field over `horizon_seconds`. A zero horizon yields empty
    /// forward-looking lists.
    pub fn predict(&self, horizon_seconds: u64) -> FieldPredictions {
        let future_laps = u32::try_from(horizon_seconds / SECONDS_PER_LAP).unwrap_or(u32::MAX);

        let competitor_predictions = self
            .competitors()
            .iter()
            .map(|c| (c.car_id().to_string(), self.predict_competitor(c, future_laps)))
            .collect();

        FieldPredictions {
            twin_id: self.twin_id().to_string(),
            timestamp: self.now(),
            horizon_seconds,
            future_laps,
            competitor_predictions,
            strategic_windows: self.predict_strategic_windows(future_laps),
            race_event_predictions: self.predict_race_events(future_laps),
            strategic_forecast: self.forecast_opportunities(future_laps),
            risk_assessment: self.predict_strategic_risks(future_laps),
        }
    }

    pub fn predict_competitor(&self, c: &CompetitorModel, future_laps: u32) -> CompetitorPrediction {
        let rate = c.degradation_rate();
        let current_degradation = f64::from(c.tire_age()) * rate;
        let future_degradation = f64::from(c.tire_age().saturating_add(future_laps)) * rate;
        let base = base_lap_time(c);

        CompetitorPrediction {
            predicted_lap_time: base * (1.0 + future_degradation - current_degradation),
            lap_time_evolution: lap_time_evolution(c, future_laps),
            degradation_factor: future_degradation,
            predicted_fuel_level: (c.fuel_level() - c.fuel_per_lap() * f64::from(future_laps)).max(0.0),
            fuel_critical_lap: self.fuel_critical_lap(c),
            pit_prediction: self.forecast_pit_timing(c, future_laps),
            performance_prediction: performance_forecast(c, future_laps),
            strategic_behavior: self.behavior_forecast(c, future_laps),
            position_prediction: position_forecast(c),
            threat_level_evolution: threat_outlook(c),
        }
    }

    /// Pit probability for `lap_offset` laps ahead.
    fn forecast_lap_pit_probability(&self, c: &CompetitorModel, lap_offset: u32) -> PitWindow {
        let ctx = self.race_context();
        let future_lap = ctx.current_lap.saturating_add(lap_offset);
        let future_age = c.tire_age().saturating_add(lap_offset);
        let lap = normalized_lap(future_lap, ctx.total_laps);

        let tire_factor = (f64::from(future_age) / 25.0 + c.tire_wear() * 0.5).min(1.0);
        let strategy_factor = match (c.predicted_strategy(), c.pit_stops().len()) {
            (PredictedStrategy::TwoStop, 0) if (15.0..=35.0).contains(&lap) => 0.7 - (lap - 25.0).abs() * 0.02,
            (PredictedStrategy::TwoStop, 1) if (35.0..=50.0).contains(&lap) => 0.8 - (lap - 42.0).abs() * 0.03,
            (PredictedStrategy::OneStop, 0) if (25.0..=40.0).contains(&lap) => 0.6 - (lap - 32.0).abs() * 0.02,
            _ => 0.0,
        };
        let fuel_level = (c.fuel_level() - c.fuel_per_lap() * f64::from(lap_offset)).max(0.0);
        let fuel_factor = (1.0 - fuel_level / FORECAST_FUEL_URGENCY).max(0.0);

        let weighted = tire_factor * 0.4 + strategy_factor * 0.4 + fuel_factor * 0.2;
        PitWindow {
            lap: future_lap,
            probability: weighted.max(fuel_factor).clamp(0.0, 1.0),
            tire_age: future_age,
            fuel_level,
            primary_factor: if tire_factor > strategy_factor {
                PitFactor::Tire
            } else {
                PitFactor::Strategy
            },
        }
    }

    pub fn forecast_pit_timing(&self, c: &CompetitorModel, future_laps: u32) -> PitTimingForecast {
        let mut windows: Vec<PitWindow> = offsets(future_laps, PIT_LOOKAHEAD)
            .map(|offset| self.forecast_lap_pit_probability(c, offset))
            .filter(|w| w.probability > 0.5)
            .collect();

        // Earliest lap wins ties
        let mut most_likely: Option<&PitWindow> = None;
        for w in &windows {
            if most_likely.map_or(true, |best| w.probability > best.probability) {
                most_likely = Some(w);
            }
        }
        let most_likely_lap = most_likely.map(|w| w.lap);
        let highest_probability = most_likely.map_or(0.0, |w| w.probability);

        windows.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        windows.truncate(MAX_PIT_WINDOWS);

        PitTimingForecast {
            most_likely_lap,
            highest_probability,
            pit_windows: windows,
            strategy_confidence: strategy_confidence(c),
        }
    }

    /// Lap at which fuel reaches the forced-stop floor, if ever.
    pub fn fuel_critical_lap(&self, c: &CompetitorModel) -> Option<u32> {
        let current = self.race_context().current_lap;
        if c.fuel_level() <= FUEL_ALREADY_CRITICAL {
            return Some(current);
        }
        let per_lap = c.fuel_per_lap();
        if per_lap <= 0.0 {
            return None;
        }
        let laps = (c.fuel_level() - FUEL_CRITICAL_LEVEL) / per_lap;
        if laps > 0.0 {
            Some(current.saturating_add(laps.floor() as u32))
        } else {
            None
        }
    }

    fn behavior_forecast(&self, c: &CompetitorModel, future_laps: u32) -> BehaviorForecast {
        let ctx = self.race_context();
        let profile = c.behavioral_profile();
        let confidence = behavior_confidence(c);

        let undercut_likelihood = offsets(future_laps, BEHAVIOR_LOOKAHEAD)
            .map(|offset| {
                let future_lap = ctx.current_lap.saturating_add(offset);
                let mut score = 0.0;
                if c.position() > 1 {
                    score += (f64::from(c.position() - 1) / 10.0).min(1.0) * 0.3;
                }
                score += profile.undercut_tendency * 0.4;
                if (15.0..=35.0).contains(&normalized_lap(future_lap, ctx.total_laps)) {
                    score += 0.3;
                }
                let future_age = c.tire_age().saturating_add(offset);
                if future_age >= 10 {
                    score += (f64::from(future_age - 10) * 0.02).min(0.2);
                }
                UndercutLikelihood {
                    lap: future_lap,
                    probability: score.min(1.0),
                    confidence,
                }
            })
            .collect();

        let defensive_actions = if (1..=5).contains(&c.position()) {
            vec![DefensiveAction {
                action: "position_defense".to_string(),
                probability: profile.aggressive_defense,
                triggers: owned(&["close_following_car", "drs_zone_approach"]),
                effectiveness: profile.tire_management,
            }]
        } else {
            Vec::new()
        };

        let mut strategic_responses = Vec::new();
        if profile.aggressive_defense > 0.6 {
            strategic_responses.push(ResponsePattern {
                trigger: "undercut_attempt".to_string(),
                response: "early_pit_counter".to_string(),
                probability: profile.aggressive_defense,
                effectiveness: 0.7,
            });
        }
        if profile.tire_management > 0.7 {
            strategic_responses.push(ResponsePattern {
                trigger: "overcut_attempt".to_string(),
                response: "extend_stint".to_string(),
                probability: profile.tire_management,
                effectiveness: 0.6,
            });
        }

        BehaviorForecast {
            undercut_likelihood,
            defensive_actions,
            strategic_responses,
            risk_taking_tendency: profile.aggressive_defense,
        }
    }

    // ========================================================================
    // Field-level
    // ========================================================================

    fn predict_strategic_windows(&self, future_laps: u32) -> Vec<StrategicWindow> {
        let current = self.race_context().current_lap;
        let horizon_lap = current.saturating_add(future_laps);
        let mut windows = Vec::new();

        for offset in offsets(future_laps, WINDOW_LOOKAHEAD) {
            let future_lap = current.saturating_add(offset);
            let candidates: Vec<PitCandidate> = self
                .competitors()
                .iter()
                .filter_map(|c| {
                    let forecast = self.forecast_pit_timing(c, offset + 5);
                    let lap = forecast.most_likely_lap?;
                    (lap.abs_diff(future_lap) <= 2).then(|| PitCandidate {
                        car_id: c.car_id().to_string(),
                        probability: forecast.highest_probability,
                    })
                })
                .collect();

            if candidates.len() >= 2 {
                windows.push(StrategicWindow {
                    lap: future_lap,
                    strategic_value: (candidates.len() as f64 * 0.3).min(1.0),
                    execution_complexity: ExecutionComplexity::Medium,
                    kind: WindowKind::MassPitWindow {
                        opportunity_type: OpportunityType::TrackPositionGain,
                        affected_competitors: candidates,
                    },
                });
            }
        }

        for c in self.competitors() {
            if c.threat_level() < ThreatLevel::Medium {
                continue;
            }
            let forecast = self.forecast_pit_timing(c, future_laps);
            let Some(most_likely) = forecast.most_likely_lap else {
                continue;
            };
            let profile = c.behavioral_profile();

            let undercut_lap = most_likely.saturating_sub(2).max(1);
            if undercut_lap <= horizon_lap {
                windows.push(StrategicWindow {
                    lap: undercut_lap,
                    strategic_value: strategic_value(c, profile.undercut_tendency),
                    execution_complexity: ExecutionComplexity::Low,
                    kind: WindowKind::UndercutWindow {
                        target_competitor: c.car_id().to_string(),
                        success_probability: forecast.highest_probability * profile.undercut_tendency,
                    },
                });
            }

            let overcut_lap = most_likely + 3;
            if overcut_lap <= horizon_lap {
                windows.push(StrategicWindow {
                    lap: overcut_lap,
                    strategic_value: strategic_value(c, 1.0 - profile.aggressive_defense),
                    execution_complexity: ExecutionComplexity::Medium,
                    kind: WindowKind::OvercutWindow {
                        target_competitor: c.car_id().to_string(),
                        success_probability: (1.0 - forecast.highest_probability)
                            * (1.0 - profile.aggressive_defense),
                    },
                });
            }
        }

        windows.sort_by(|a, b| b.strategic_value.total_cmp(&a.strategic_value));
        windows.truncate(MAX_STRATEGIC_WINDOWS);
        windows
    }

    fn predict_race_events(&self, future_laps: u32) -> Vec<RaceEventPrediction> {
        let current = self.race_context().current_lap;
        let mut events = Vec::new();

        // Pit-stop waves
        let mut activity: BTreeMap<u32, Vec<(String, f64)>> = BTreeMap::new();
        for c in self.competitors() {
            for w in self.forecast_pit_timing(c, future_laps).pit_windows {
                activity.entry(w.lap).or_default().push((c.car_id().to_string(), w.probability));
            }
        }
        for (lap, cars) in activity {
            if cars.len() >= 3 {
                let mean = cars.iter().map(|(_, p)| p).sum::<f64>() / cars.len() as f64;
                events.push(RaceEventPrediction {
                    probability: mean.min(1.0),
                    strategic_impact: RiskLevel::High,
                    kind: PredictedEventKind::PitStopWave {
                        lap,
                        affected_cars: cars.into_iter().map(|(id, _)| id).collect(),
                    },
                });
            }
        }

        // Close battles between adjacent positions
        let mut by_position: BTreeMap<u32, &CompetitorModel> = BTreeMap::new();
        for c in self.competitors() {
            if c.position() > 0 {
                by_position.entry(c.position()).or_insert(c);
            }
        }
        for (&pos, &car) in &by_position {
            let Some(&behind) = pos.checked_add(1).and_then(|next| by_position.get(&next)) else {
                continue;
            };
            if (car.gap_to_leader() - behind.gap_to_leader()).abs() < 2.0 {
                events.push(RaceEventPrediction {
                    probability: 0.7,
                    strategic_impact: RiskLevel::Medium,
                    kind: PredictedEventKind::PositionBattle {
                        lap_range: [current.saturating_add(1), current.saturating_add(5)],
                        involved_cars: vec![car.car_id().to_string(), behind.car_id().to_string()],
                        drs_factor: true,
                    },
                });
            }
        }

        // Fuel-critical cars
        let horizon_lap = current.saturating_add(future_laps);
        for c in self.competitors() {
            if let Some(lap) = self.fuel_critical_lap(c).filter(|&lap| lap <= horizon_lap) {
                events.push(RaceEventPrediction {
                    probability: 0.8,
                    strategic_impact: RiskLevel::High,
                    kind: PredictedEventKind::FuelCritical {
                        lap,
                        car_id: c.car_id().to_string(),
                        forced_pit_stop: true,
                    },
                });
            }
        }

        events.sort_by_key(RaceEventPrediction::lap);
        events
    }

    fn forecast_opportunities(&self, future_laps: u32) -> Vec<OpportunityForecast> {
        let current = self.race_context().current_lap;
        let horizon_lap = current.saturating_add(future_laps);
        self.strategic_opportunities()
            .iter()
            .filter(|o| o.execution_lap <= horizon_lap)
            .map(|o| {
                let target = self.get_competitor(&o.target_car);
                OpportunityForecast {
                    opportunity: o.clone(),
                    time_to_execution_secs: (i64::from(o.execution_lap) - i64::from(current))
                        * SECONDS_PER_LAP as i64,
                    success_factors: target.map(|c| self.opportunity_factors(o, c)),
                    predicted_outcome: target.map(|c| self.opportunity_outcome(o, c)),
                }
            })
            .collect()
    }

    fn opportunity_factors(&self, o: &StrategicOpportunity, c: &CompetitorModel) -> SuccessFactors {
        let ctx = self.race_context();
        let profile = c.behavioral_profile();
        let undercut = o.opportunity_type == OpportunityType::UndercutWindow;
        let position_diff = f64::from(c.position().abs_diff(ctx.our_position));
        let lap_diff = f64::from(o.execution_lap.abs_diff(ctx.current_lap));

        SuccessFactors {
            tire_advantage: if undercut {
                (f64::from(c.tire_age()) / 20.0).min(1.0)
            } else {
                0.0
            },
            position_advantage: (1.0 - position_diff / 5.0).max(0.0),
            timing_advantage: (1.0 - lap_diff / 5.0).max(0.0),
            behavioral_factor: if undercut {
                1.0 - profile.aggressive_defense
            } else {
                profile.tire_management
            },
        }
    }

    fn opportunity_outcome(&self, o: &StrategicOpportunity, c: &CompetitorModel) -> OpportunityOutcome {
        let mut outcome = OpportunityOutcome {
            success_probability: o.probability,
            position_gain_expected: 0,
            time_advantage_expected: 0.0,
            risk_factors: Vec::new(),
            success_scenarios: Vec::new(),
            failure_scenarios: Vec::new(),
        };

        match o.opportunity_type {
            OpportunityType::UndercutWindow => {
                let tire_advantage = f64::from(c.tire_age().saturating_sub(5)) * 0.1;
                if c.position().abs_diff(self.race_context().our_position) <= 1 {
                    outcome.position_gain_expected = 1;
                    outcome.time_advantage_expected = 3.0 + tire_advantage;
                    outcome.success_scenarios = owned(&[
                        "Clean pit stop execution",
                        "Competitor pits as predicted",
                        "Track position maintained",
                    ]);
                    outcome.failure_scenarios = owned(&[
                        "Competitor doesn't pit",
                        "Slow pit stop",
                        "Traffic interference",
                    ]);
                }
                if c.behavioral_profile().aggressive_defense > 0.7 {
                    outcome.risk_factors.push("Aggressive defensive response expected".to_string());
                }
                if c.pit_probability() < 0.6 {
                    outcome.risk_factors.push("Uncertain competitor pit timing".to_string());
                }
            }
            OpportunityType::OvercutWindow => {
                let degradation_risk = f64::from(c.tire_age()) * c.degradation_rate();
                let fuel_advantage = (c.fuel_level() - 0.3) * 2.0;
                outcome.time_advantage_expected = fuel_advantage - degradation_risk;
                outcome.success_scenarios = owned(&[
                    "Competitor pits early",
                    "Tire degradation manageable",
                    "Fuel advantage realized",
                ]);
                outcome.failure_scenarios = owned(&[
                    "Excessive tire degradation",
                    "Competitor stays out longer",
                    "Safety car neutralizes advantage",
                ]);
            }
            _ => {}
        }

        let penalty = outcome.risk_factors.len() as f64 * 0.1;
        outcome.success_probability = (outcome.success_probability - penalty).max(0.0);
        outcome
    }

    fn predict_strategic_risks(&self, future_laps: u32) -> RiskAssessment {
        let ctx = self.race_context();

        let mut undercut_risks = Vec::new();
        for c in self.competitors() {
            let tendency = c.behavioral_profile().undercut_tendency;
            if tendency <= 0.6 || c.threat_level() < ThreatLevel::Medium {
                continue;
            }
            let forecast = self.forecast_pit_timing(c, future_laps);
            if let Some(lap) = forecast.most_likely_lap {
                undercut_risks.push(UndercutRisk {
                    car_id: c.car_id().to_string(),
                    risk_score: tendency * forecast.highest_probability * c.threat_level().risk_multiplier(),
                    likely_execution_lap: lap.saturating_sub(1),
                    mitigation_window: [lap.saturating_sub(3), lap.saturating_sub(1)],
                });
            }
        }

        let position_loss_risks = self
            .competitors()
            .iter()
            .filter(|c| {
                Some(c.position()) == ctx.our_position.checked_add(1) && c.threat_level() >= ThreatLevel::Medium
            })
            .map(|c| {
                let profile = c.behavioral_profile();
                PositionLossRisk {
                    car_id: c.car_id().to_string(),
                    risk_type: "direct_position_loss".to_string(),
                    risk_score: profile.undercut_tendency * 0.4
                        + c.pit_probability() * 0.3
                        + (1.0 - profile.tire_management) * 0.3,
                    mitigation_actions: owned(&["early_pit", "defensive_positioning"]),
                }
            })
            .collect();

        let isolation = self.isolation_risk();
        let high = undercut_risks.iter().filter(|r| r.risk_score > 0.7).count();
        let medium = undercut_risks
            .iter()
            .filter(|r| (0.4..=0.7).contains(&r.risk_score))
            .count();

        let overall_risk_level = if high >= 2 || isolation > 0.8 {
            RiskLevel::Critical
        } else if high >= 1 || medium >= 3 {
            RiskLevel::High
        } else if medium >= 1 || isolation > 0.5 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        RiskAssessment {
            undercut_risks,
            position_loss_risks,
            strategic_isolation_risk: isolation,
            overall_risk_level,
        }
    }

    /// Risk of running a strategy few competitors share, weighted by track position.
    fn isolation_risk(&self) -> f64 {
        let total = self.competitor_count();
        if total == 0 {
            return 0.0;
        }
        let similar = self
            .competitors()
            .iter()
            .filter(|c| c.predicted_strategy() == OUR_ASSUMED_STRATEGY)
            .count();
        let isolation = 1.0 - similar as f64 / total as f64;
        let position_factor = (f64::from(self.race_context().our_position) / 10.0).min(1.0);
        (isolation * 0.7 + position_factor * 0.3).min(1.0)
    }
}

// ============================================================================
// Pure helpers
// ============================================================================

fn base_lap_time(c: &CompetitorModel) -> f64 {
    if c.last_lap_time() > 0.0 {
        c.last_lap_time()
    } else {
        DEFAULT_LAP_TIME
    }
}

fn lap_time_evolution(c: &CompetitorModel, future_laps: u32) -> Vec<LapTimePoint> {
    let base = base_lap_time(c);
    offsets(future_laps, LAP_TIME_LOOKAHEAD)
        .map(|offset| {
            let tire_age = c.tire_age().saturating_add(offset);
            let degradation = f64::from(tire_age) * c.degradation_rate();
            let fuel_benefit = f64::from(offset) * c.fuel_per_lap() * 0.3;
            LapTimePoint {
                lap_offset: offset,
                predicted_lap_time: base + degradation - fuel_benefit,
                tire_age,
                degradation_impact: degradation,
            }
        })
        .collect()
}

fn performance_forecast(c: &CompetitorModel, future_laps: u32) -> PerformanceForecast {
    let history = c.lap_times_history();
    let base = if history.len() >= 3 {
        let recent: Vec<f64> = history.iter().rev().take(5).map(|s| s.lap_time).collect();
        recent.iter().sum::<f64>() / recent.len() as f64
    } else {
        base_lap_time(c)
    };

    let evolution: Vec<PerformancePoint> = offsets(future_laps, PERFORMANCE_LOOKAHEAD)
        .map(|offset| {
            let laps = f64::from(offset);
            let degradation_impact = laps * c.degradation_rate();
            let fuel_benefit = c.fuel_per_lap() * laps * 0.3;
            let track_evolution = laps * 0.01;
            let predicted = base + degradation_impact - fuel_benefit - track_evolution;
            PerformancePoint {
                lap_offset: offset,
                predicted_lap_time: predicted,
                degradation_impact,
                fuel_benefit,
                relative_performance: predicted - base,
            }
        })
        .collect();

    let peak_performance_lap = evolution
        .iter()
        .min_by(|a, b| a.predicted_lap_time.total_cmp(&b.predicted_lap_time))
        .map_or(0, |p| p.lap_offset);

    PerformanceForecast {
        base_performance: base,
        evolution,
        peak_performance_lap,
        degradation_trend: c.degradation_rate(),
        tire_management_factor: c.behavioral_profile().tire_management,
    }
}

fn position_forecast(c: &CompetitorModel) -> PositionForecast {
    let history = c.position_history();
    let recent: Vec<u32> = history.iter().rev().take(5).map(|s| s.position).collect();
    // `recent` runs newest first
    let position_trend = match (recent.first(), recent.last()) {
        (Some(&newest), Some(&oldest)) if newest < oldest => PositionTrend::Improving,
        (Some(&newest), Some(&oldest)) if newest > oldest => PositionTrend::Declining,
        _ => PositionTrend::Stable,
    };

    PositionForecast {
        position_volatility: (history.len() as f64 * 0.1).min(1.0),
        likely_position_range: [c.position().saturating_sub(2).max(1), c.position().saturating_add(2).min(20)],
        position_trend,
    }
}

fn threat_outlook(c: &CompetitorModel) -> Vec<ThreatOutlook> {
    if c.pit_probability() > 0.7 {
        vec![ThreatOutlook::ThreatIncreasePrePit, ThreatOutlook::ThreatDecreasePostPit]
    } else if c.tire_age() > 20 {
        vec![ThreatOutlook::ThreatDecreaseDegradation]
    } else {
        vec![ThreatOutlook::ThreatStable]
    }
}

fn strategy_confidence(c: &CompetitorModel) -> f64 {
    let data_quality = (c.lap_times_history().len() as f64 / 10.0).min(1.0);
    let consistency = c.behavioral_profile().tire_management;
    let pit_history = (c.pit_stops().len() as f64 * 0.3).min(1.0);
    (data_quality + consistency + pit_history) / 3.0
}

fn behavior_confidence(c: &CompetitorModel) -> f64 {
    (c.position_history().len() as f64 / 20.0).min(1.0)
}

/// Value of attacking `c`; `strategy_factor` is the tendency that makes the
/// move likely to work.
fn strategic_value(c: &CompetitorModel, strategy_factor: f64) -> f64 {
    let position_factor = (10.0 - f64::from(c.position())).max(0.0) / 10.0;
    let threat_factor = match c.threat_level() {
        ThreatLevel::Low => 0.2,
        ThreatLevel::Medium => 0.5,
        ThreatLevel::High => 0.8,
        ThreatLevel::Critical => 1.0,
    };
    (0.5 + position_factor * 0.3 + threat_factor * 0.2 + strategy_factor * 0.2).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RaceConfig;
    use crate::types::{CarSnapshot, TelemetryFrame, TireCompound, TireSnapshot, TrackConditions, TrackStatus};
    use std::sync::Arc;

    fn car(id: &str, position: u32, tire_age: u32, fuel: f64) -> CarSnapshot {
        CarSnapshot {
            car_id: id.to_string(),
            position: Some(position),
            tire: TireSnapshot {
                compound: Some(TireCompound::Medium),
                age: Some(tire_age),
                wear_level: Some(0.4),
            },
            fuel_level: Some(fuel),
            lap_time: Some(84.0 + f64::from(position) * 0.1),
            ..Default::default()
        }
    }

    fn create_sample_frame(lap: u32) -> TelemetryFrame {
        TelemetryFrame {
            lap: Some(lap),
            track_conditions: TrackConditions {
                track_status: Some(TrackStatus::Green),
                ..Default::default()
            },
            cars: vec![
                car("1", 1, 18, 0.6),
                car("16", 2, 17, 0.6),
                car("44", 3, 12, 0.6),
                car("55", 4, 19, 0.6),
                car("63", 5, 16, 0.08),
            ],
            ..Default::default()
        }
    }

    fn twin_at(lap: u32) -> FieldTwin {
        let mut twin = FieldTwin::new(&RaceConfig::default(), Arc::new(ManualClock::at_epoch()));
        twin.update_state(&create_sample_frame(lap)).unwrap();
        twin
    }

    #[test]
    fn zero_horizon_is_trivial() {
        let twin = twin_at(20);
        let p = twin.predict(0);
        assert_eq!(p.future_laps, 0);
        assert_eq!(p.competitor_predictions.len(), 4);
        for pred in p.competitor_predictions.values() {
            assert!(pred.lap_time_evolution.is_empty());
            assert!(pred.pit_prediction.pit_windows.is_empty());
            assert!(pred.pit_prediction.most_likely_lap.is_none());
            assert!(pred.performance_prediction.evolution.is_empty());
            assert_eq!(pred.performance_prediction.peak_performance_lap, 0);
            assert!(pred.strategic_behavior.undercut_likelihood.is_empty());
        }
        assert!(p.strategic_windows.is_empty());
    }

    #[test]
    fn horizon_converts_to_laps() {
        let twin = twin_at(20);
        let p = twin.predict(900);
        assert_eq!(p.future_laps, 10);
        let pred = &p.competitor_predictions["16"];
        assert_eq!(pred.lap_time_evolution.len(), 9);
        assert_eq!(pred.performance_prediction.evolution.len(), 10);
        assert_eq!(pred.strategic_behavior.undercut_likelihood.len(), 9);
    }

    #[test]
    fn pit_windows_capped_and_sorted() {
        let twin = twin_at(20);
        let p = twin.predict(3600);
        for pred in p.competitor_predictions.values() {
            let windows = &pred.pit_prediction.pit_windows;
            assert!(windows.len() <= 5);
            assert!(windows.windows(2).all(|w| w[0].probability >= w[1].probability));
            if let Some(first) = windows.first() {
                assert_eq!(pred.pit_prediction.highest_probability, first.probability);
            }
        }
    }

    #[test]
    fn fuel_critical_lap_extrapolates_to_floor() {
        let twin = twin_at(20);
        // 0.6 fuel: (0.6 - 0.05) / 0.021 = 26.19 laps
        let c = twin.get_competitor("16").unwrap();
        assert_eq!(twin.fuel_critical_lap(c), Some(46));
        // Already below 10%
        let low = twin.get_competitor("63").unwrap();
        assert_eq!(twin.fuel_critical_lap(low), Some(20));
    }

    #[test]
    fn fuel_critical_event_is_predicted() {
        let twin = twin_at(20);
        let p = twin.predict(300);
        assert!(p.race_event_predictions.iter().any(|e| matches!(
            &e.kind,
            PredictedEventKind::FuelCritical { car_id, lap: 20, .. } if car_id == "63"
        )));
        assert!(p.race_event_predictions.windows(2).all(|w| w[0].lap() <= w[1].lap()));
    }

    #[test]
    fn adjacent_cars_form_position_battles() {
        let twin = twin_at(20);
        let p = twin.predict(300);
        let battles: Vec<_> = p
            .race_event_predictions
            .iter()
            .filter(|e| matches!(e.kind, PredictedEventKind::PositionBattle { .. }))
            .collect();
        // 1-16 and 55-63 are adjacent; 16 and 55 are split by our car
        assert_eq!(battles.len(), 2);
    }

    #[test]
    fn strategic_windows_sorted_by_value() {
        let twin = twin_at(20);
        let p = twin.predict(1800);
        assert!(p.strategic_windows.len() <= 10);
        assert!(p
            .strategic_windows
            .windows(2)
            .all(|w| w[0].strategic_value >= w[1].strategic_value));
    }

    #[test]
    fn risk_assessment_levels_are_consistent() {
        let twin = twin_at(20);
        let risk = twin.predict(600).risk_assessment;
        assert!((0.0..=1.0).contains(&risk.strategic_isolation_risk));
        // 55 sits directly behind us
        assert!(risk.position_loss_risks.iter().all(|r| r.car_id == "55"));
    }

    #[test]
    fn performance_forecast_prefers_recent_mean() {
        let mut twin = FieldTwin::new(&RaceConfig::default(), Arc::new(ManualClock::at_epoch()));
        for lap in 1..=4 {
            twin.update_state(&create_sample_frame(lap)).unwrap();
        }
        let c = twin.get_competitor("1").unwrap();
        let forecast = performance_forecast(c, 3);
        assert!((forecast.base_performance - 84.1).abs() < 1e-9);
        assert_eq!(forecast.evolution.len(), 3);
    }

    #[test]
    fn last_representable_lap_saturates() {
        let twin = twin_at(u32::MAX);
        let p = twin.predict(900);
        for pred in p.competitor_predictions.values() {
            assert!(pred.pit_prediction.pit_windows.iter().all(|w| w.lap == u32::MAX));
        }
        let battles: Vec<_> = p
            .race_event_predictions
            .iter()
            .filter_map(|e| match &e.kind {
                PredictedEventKind::PositionBattle { lap_range, .. } => Some(*lap_range),
                _ => None,
            })
            .collect();
        assert_eq!(battles, vec![[u32::MAX, u32::MAX]; 2]);
    }

    #[test]
    fn predictions_are_deterministic() {
        let twin = twin_at(25);
        let a = twin.predict(1200);
        let b = twin.predict(1200);
        assert_eq!(a, b);
    }
}
