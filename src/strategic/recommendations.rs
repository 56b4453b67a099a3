//! Actionable recommendations from opportunities and threats

use serde::Serialize;

use super::threats::ThreatAssessment;
use crate::twin::FieldTwin;
use crate::types::RiskLevel;

/// Opportunities considered, in list order
const MAX_OPPORTUNITY_RECOMMENDATIONS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationKind {
    Opportunity,
    Defensive,
    Strategic,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub kind: RecommendationKind,
    pub priority: Priority,
    pub action: String,
    pub timing: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_probability: Option<f64>,
    pub reasoning: String,
}

pub fn generate_recommendations(twin: &FieldTwin, threats: &ThreatAssessment) -> Vec<Recommendation> {
    let mut recommendations: Vec<Recommendation> = twin
        .strategic_opportunities()
        .iter()
        .take(MAX_OPPORTUNITY_RECOMMENDATIONS)
        .filter(|o| o.probability > 0.6)
        .map(|o| Recommendation {
            kind: RecommendationKind::Opportunity,
            priority: if o.probability > 0.8 {
                Priority::High
            } else {
                Priority::Medium
            },
            action: format!("Consider {} against {}", o.opportunity_type, o.target_car),
            timing: format!("Execute on lap {}", o.execution_lap),
            success_probability: Some(o.probability),
            reasoning: o.reasoning.clone(),
        })
        .collect();

    if threats.overall_risk_level >= RiskLevel::High {
        recommendations.push(Recommendation {
            kind: RecommendationKind::Defensive,
            priority: Priority::High,
            action: "Prepare defensive strategy".to_string(),
            timing: "Immediate".to_string(),
            success_probability: None,
            reasoning: format!("Multiple threats detected ({} immediate)", threats.immediate_threats.len()),
        });
    }

    let likely_pitters = twin
        .competitors()
        .iter()
        .filter(|c| c.pit_probability() > 0.7)
        .count();
    if likely_pitters >= 2 {
        let lap = twin.race_context().current_lap;
        recommendations.push(Recommendation {
            kind: RecommendationKind::Strategic,
            priority: Priority::Medium,
            action: "Monitor pit window closely".to_string(),
            timing: format!("Next 3-5 laps (laps {}-{})", lap.saturating_add(3), lap.saturating_add(5)),
            success_probability: None,
            reasoning: format!("{likely_pitters} competitors likely to pit soon"),
        });
    }

    recommendations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::RaceConfig;
    use crate::types::{CarSnapshot, OpportunityType, TelemetryFrame, TireSnapshot, TrackConditions, TrackStatus};
    use std::sync::Arc;

    fn car(id: &str, position: u32, tire_age: u32, wear: f64) -> CarSnapshot {
        CarSnapshot {
            car_id: id.to_string(),
            position: Some(position),
            tire: TireSnapshot {
                age: Some(tire_age),
                wear_level: Some(wear),
                ..Default::default()
            },
            fuel_level: Some(0.6),
            lap_time: Some(85.0),
            ..Default::default()
        }
    }

    fn frame(lap: u32, status: TrackStatus, cars: Vec<CarSnapshot>) -> TelemetryFrame {
        TelemetryFrame {
            lap: Some(lap),
            track_conditions: TrackConditions {
                track_status: Some(status),
                ..Default::default()
            },
            cars,
            ..Default::default()
        }
    }

    fn twin_with(frames: &[TelemetryFrame]) -> FieldTwin {
        let mut twin = FieldTwin::new(&RaceConfig::default(), Arc::new(ManualClock::at_epoch()));
        for f in frames {
            twin.update_state(f).unwrap();
        }
        twin
    }

    #[test]
    fn quiet_field_has_no_recommendations() {
        let twin = twin_with(&[frame(5, TrackStatus::Green, vec![car("44", 1, 5, 0.1), car("20", 15, 5, 0.1)])]);
        let threats = ThreatAssessment::assess(twin.competitors());
        assert!(generate_recommendations(&twin, &threats).is_empty());
    }

    #[test]
    fn safety_car_window_becomes_high_priority_opportunity() {
        let cars = vec![car("44", 1, 5, 0.1), car("20", 15, 5, 0.1)];
        let twin = twin_with(&[
            frame(5, TrackStatus::Green, cars.clone()),
            frame(6, TrackStatus::SafetyCar, cars),
        ]);
        let threats = ThreatAssessment::assess(twin.competitors());
        let recs = generate_recommendations(&twin, &threats);

        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].kind, RecommendationKind::Opportunity);
        assert_eq!(recs[0].priority, Priority::High);
        assert_eq!(
            recs[0].action,
            format!("Consider {} against field", OpportunityType::SafetyCarOpportunity)
        );
        assert_eq!(recs[0].timing, "Execute on lap 6");
    }

    #[test]
    fn worn_field_triggers_monitoring_recommendation() {
        let mut cars = vec![car("44", 1, 5, 0.1), car("1", 12, 30, 1.0), car("16", 14, 30, 1.0)];
        for c in &mut cars[1..] {
            c.fuel_level = Some(0.15);
        }
        let twin = twin_with(&[frame(20, TrackStatus::Green, cars)]);
        let threats = ThreatAssessment::assess(twin.competitors());
        let recs = generate_recommendations(&twin, &threats);

        let monitor = recs
            .iter()
            .find(|r| r.kind == RecommendationKind::Strategic)
            .expect("monitoring recommendation");
        assert_eq!(monitor.timing, "Next 3-5 laps (laps 23-25)");
        assert_eq!(monitor.reasoning, "2 competitors likely to pit soon");
    }

    #[test]
    fn monitoring_window_saturates_on_last_lap() {
        let mut cars = vec![car("44", 1, 5, 0.1), car("1", 12, 30, 1.0), car("16", 14, 30, 1.0)];
        for c in &mut cars[1..] {
            c.fuel_level = Some(0.0);
        }
        let twin = twin_with(&[frame(u32::MAX, TrackStatus::Green, cars)]);
        let threats = ThreatAssessment::assess(twin.competitors());
        let monitor = generate_recommendations(&twin, &threats)
            .into_iter()
            .find(|r| r.kind == RecommendationKind::Strategic)
            .expect("monitoring recommendation");
        assert_eq!(monitor.timing, format!("Next 3-5 laps (laps {0}-{0})", u32::MAX));
    }
}
