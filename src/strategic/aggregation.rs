//! Field-wide aggregation of competitor state

use serde::Serialize;
use std::collections::BTreeMap;

use crate::twin::CompetitorModel;
use crate::types::{PredictedStrategy, ThreatLevel};

/// Spread of one behavioral metric across the field
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Default)]
pub struct PatternStats {
    pub average: f64,
    pub min: f64,
    pub max: f64,
}

impl PatternStats {
    pub fn from_values<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        let mut count = 0usize;
        let mut sum = 0.0;
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        for v in values {
            count += 1;
            sum += v;
            min = min.min(v);
            max = max.max(v);
        }
        if count == 0 {
            return Self::default();
        }
        Self {
            average: sum / count as f64,
            min,
            max,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct StrategicPatterns {
    pub undercut_tendency: PatternStats,
    pub aggressive_defense: PatternStats,
    pub tire_management: PatternStats,
}

/// Counts and distributions over every tracked competitor
#[derive(Debug, Clone, Serialize, PartialEq, Default)]
pub struct CompetitorSummary {
    pub total_competitors: usize,
    pub threat_levels: BTreeMap<ThreatLevel, usize>,
    /// First-seen order
    pub pit_probabilities: Vec<f64>,
    pub active_strategies: BTreeMap<PredictedStrategy, usize>,
    pub strategic_patterns: StrategicPatterns,
}

impl CompetitorSummary {
    pub fn from_competitors(competitors: &[CompetitorModel]) -> Self {
        let mut threat_levels = BTreeMap::new();
        let mut active_strategies = BTreeMap::new();
        for c in competitors {
            *threat_levels.entry(c.threat_level()).or_insert(0) += 1;
            *active_strategies.entry(c.predicted_strategy()).or_insert(0) += 1;
        }

        let profiles = || competitors.iter().map(CompetitorModel::behavioral_profile);
        Self {
            total_competitors: competitors.len(),
            threat_levels,
            pit_probabilities: competitors.iter().map(CompetitorModel::pit_probability).collect(),
            active_strategies,
            strategic_patterns: StrategicPatterns {
                undercut_tendency: PatternStats::from_values(profiles().map(|p| p.undercut_tendency)),
                aggressive_defense: PatternStats::from_values(profiles().map(|p| p.aggressive_defense)),
                tire_management: PatternStats::from_values(profiles().map(|p| p.tire_management)),
            },
        }
    }

    pub fn count_at(&self, level: ThreatLevel) -> usize {
        self.threat_levels.get(&level).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::twin::HistoryLimits;
    use crate::types::CarSnapshot;
    use chrono::Utc;

    #[test]
    fn pattern_stats_handle_empty_input() {
        assert_eq!(PatternStats::from_values(Vec::new()), PatternStats::default());
    }

    #[test]
    fn pattern_stats_track_spread() {
        let stats = PatternStats::from_values([0.2, 0.5, 0.8]);
        assert!((stats.average - 0.5).abs() < 1e-9);
        assert_eq!(stats.min, 0.2);
        assert_eq!(stats.max, 0.8);
    }

    #[test]
    fn summary_counts_fresh_competitors() {
        let mut a = CompetitorModel::new("1", "Red Bull", "Verstappen", HistoryLimits::default());
        let b = CompetitorModel::new("16", "Ferrari", "Leclerc", HistoryLimits::default());
        a.update_state(&CarSnapshot::new("1", "Red Bull", "Verstappen"), 1, Utc::now());

        let summary = CompetitorSummary::from_competitors(&[a, b]);
        assert_eq!(summary.total_competitors, 2);
        assert_eq!(summary.count_at(ThreatLevel::Medium), 2);
        assert_eq!(summary.count_at(ThreatLevel::Critical), 0);
        assert_eq!(summary.active_strategies.get(&PredictedStrategy::TwoStop), Some(&2));
        assert_eq!(summary.pit_probabilities, vec![0.0, 0.0]);
        assert!((summary.strategic_patterns.tire_management.average - 0.5).abs() < 1e-9);
    }
}
