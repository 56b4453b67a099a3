//! Threat assessment across the field

use serde::Serialize;

use crate::twin::CompetitorModel;
use crate::types::{RiskLevel, ThreatLevel};

/// Pit probability above which a medium threat counts as emerging
const EMERGING_PIT_PROBABILITY: f64 = 0.6;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThreatEntry {
    pub car_id: String,
    pub team: String,
    pub threat_level: ThreatLevel,
    pub pit_probability: f64,
    pub position: u32,
}

impl ThreatEntry {
    fn from_competitor(c: &CompetitorModel) -> Self {
        Self {
            car_id: c.car_id().to_string(),
            team: c.team().to_string(),
            threat_level: c.threat_level(),
            pit_probability: c.pit_probability(),
            position: c.position(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StrategicRisk {
    pub car_id: String,
    pub risk_type: String,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ThreatAssessment {
    /// High and critical threats
    pub immediate_threats: Vec<ThreatEntry>,
    /// Medium threats likely to pit soon
    pub emerging_threats: Vec<ThreatEntry>,
    pub strategic_risks: Vec<StrategicRisk>,
    pub overall_risk_level: RiskLevel,
}

impl ThreatAssessment {
    /// Weighted threat score: critical counts 2, high counts 1.
    pub fn assess(competitors: &[CompetitorModel]) -> Self {
        let mut immediate_threats = Vec::new();
        let mut emerging_threats = Vec::new();
        let mut strategic_risks = Vec::new();
        let mut score = 0u32;

        for c in competitors {
            match c.threat_level() {
                ThreatLevel::Critical => {
                    score += 2;
                    immediate_threats.push(ThreatEntry::from_competitor(c));
                }
                ThreatLevel::High => {
                    score += 1;
                    immediate_threats.push(ThreatEntry::from_competitor(c));
                }
                ThreatLevel::Medium if c.pit_probability() > EMERGING_PIT_PROBABILITY => {
                    emerging_threats.push(ThreatEntry::from_competitor(c));
                }
                _ => {}
            }

            let tendency = c.behavioral_profile().undercut_tendency;
            if tendency > 0.7 && c.pit_probability() > 0.4 {
                strategic_risks.push(StrategicRisk {
                    car_id: c.car_id().to_string(),
                    risk_type: "undercut_risk".to_string(),
                    probability: c.pit_probability() * tendency,
                });
            }
        }

        let overall_risk_level = if score >= 3 {
            RiskLevel::Critical
        } else if score >= 2 {
            RiskLevel::High
        } else if score >= 1 || emerging_threats.len() > 2 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        };

        Self {
            immediate_threats,
            emerging_threats,
            strategic_risks,
            overall_risk_level,
        }
    }

    /// Number of high or critical threats
    pub fn high_threat_count(&self) -> usize {
        self.immediate_threats.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twin::HistoryLimits;
    use crate::types::{CarSnapshot, TireSnapshot};
    use chrono::Utc;

    /// Competitor whose threat is assessed against our car at `our_position`
    fn competitor(id: &str, position: u32, our_position: u32, tire_age: u32) -> CompetitorModel {
        let mut c = CompetitorModel::new(id, "Team", "Driver", HistoryLimits::default());
        let snapshot = CarSnapshot {
            car_id: id.to_string(),
            position: Some(position),
            tire: TireSnapshot {
                age: Some(tire_age),
                wear_level: Some(0.2),
                ..Default::default()
            },
            fuel_level: Some(0.6),
            ..Default::default()
        };
        c.update_state(&snapshot, 10, Utc::now());
        c.calculate_pit_probability(10, 50);
        c.assess_strategic_threat(our_position, 0.0);
        c
    }

    #[test]
    fn empty_field_is_low_risk() {
        let assessment = ThreatAssessment::assess(&[]);
        assert_eq!(assessment.overall_risk_level, RiskLevel::Low);
        assert!(assessment.immediate_threats.is_empty());
    }

    #[test]
    fn distant_cars_are_not_threats() {
        let field = vec![competitor("20", 15, 1, 10), competitor("21", 16, 1, 10)];
        let assessment = ThreatAssessment::assess(&field);
        assert_eq!(assessment.overall_risk_level, RiskLevel::Low);
        assert!(assessment.emerging_threats.is_empty());
    }

    #[test]
    fn fresh_tires_near_us_escalate_risk() {
        // Adjacent, close gap and fresh tires: medium escalated to high
        let field = vec![competitor("16", 4, 3, 2), competitor("55", 2, 3, 3)];
        for c in &field {
            assert_eq!(c.threat_level(), ThreatLevel::High, "car {}", c.car_id());
        }
        let assessment = ThreatAssessment::assess(&field);
        assert_eq!(assessment.high_threat_count(), 2);
        assert_eq!(assessment.overall_risk_level, RiskLevel::High);
        assert_eq!(assessment.immediate_threats[0].car_id, "16");
    }
}
