//! FieldTwin - the field-wide aggregate of competitor models
//!
//! Processes one telemetry frame at a time, keeps the race context, logs race
//! events and maintains the ranked strategic-opportunity list.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::competitor::{CompetitorModel, CompetitorState, HistoryLimits};
use super::throttle::{seconds, ScanThrottle};
use super::TwinError;
use crate::clock::Clock;
use crate::config::{FieldTwinConfig, RaceConfig};
use crate::types::{
    OpportunityType, PitStopRecord, RaceEvent, RaceEventKind, ResimulationTrigger, RiskLevel,
    SessionType, StrategicOpportunity, TelemetryFrame, ThreatLevel, TrackStatus, FIELD_TARGET,
};

/// Gap proxy per position behind the leader (seconds). Not real timing data.
pub const GAP_PER_POSITION_SECS: f64 = 1.5;

// ============================================================================
// Race Context
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RaceContext {
    pub current_lap: u32,
    pub total_laps: u32,
    pub session_type: SessionType,
    pub track_status: TrackStatus,
    pub our_position: u32,
    pub our_gap_to_leader: f64,
}

impl RaceContext {
    fn new(total_laps: u32) -> Self {
        Self {
            current_lap: 0,
            total_laps,
            session_type: SessionType::Race,
            track_status: TrackStatus::Green,
            our_position: 1,
            our_gap_to_leader: 0.0,
        }
    }

    /// Fraction of the race distance completed
    pub fn progress(&self) -> f64 {
        if self.total_laps == 0 {
            0.0
        } else {
            f64::from(self.current_lap) / f64::from(self.total_laps)
        }
    }
}

// ============================================================================
// Exported State
// ============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TwinMetrics {
    pub update_count: u64,
    pub frames_rejected: u64,
    pub competitor_count: usize,
    pub total_events: usize,
    pub last_update: Option<DateTime<Utc>>,
}

/// Serializable snapshot of the whole twin
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FieldTwinState {
    pub timestamp: DateTime<Utc>,
    pub twin_id: String,
    pub competitors: Vec<CompetitorState>,
    pub strategic_opportunities: Vec<StrategicOpportunity>,
    pub race_context: RaceContext,
    pub recent_events: Vec<RaceEvent>,
    pub metrics: TwinMetrics,
}

// ============================================================================
// Field Twin
// ============================================================================

#[derive(Debug)]
pub struct FieldTwin {
    twin_id: String,
    our_car_id: String,
    config: FieldTwinConfig,
    limits: HistoryLimits,
    clock: Arc<dyn Clock>,
    created_at: DateTime<Utc>,

    /// First-seen order
    competitors: Vec<CompetitorModel>,
    index: HashMap<String, usize>,

    context: RaceContext,
    strategic_opportunities: Vec<StrategicOpportunity>,
    race_events: Vec<RaceEvent>,
    /// Pit stops already turned into race events, per car
    announced_pit_stops: HashMap<String, usize>,
    throttle: ScanThrottle,

    update_count: u64,
    frames_rejected: u64,
    last_update: Option<DateTime<Utc>>,
}

impl FieldTwin {
    pub fn new(config: &RaceConfig, clock: Arc<dyn Clock>) -> Self {
        let now = clock.now();
        Self {
            twin_id: config.race.twin_id.clone(),
            our_car_id: config.race.our_car_id.clone(),
            config: config.field_twin.clone(),
            limits: HistoryLimits::from(&config.field_twin),
            created_at: now,
            competitors: Vec::new(),
            index: HashMap::new(),
            context: RaceContext::new(config.race.total_laps),
            strategic_opportunities: Vec::new(),
            race_events: Vec::new(),
            announced_pit_stops: HashMap::new(),
            throttle: ScanThrottle::new(config.field_twin.opportunity_scan_interval_secs, now),
            update_count: 0,
            frames_rejected: 0,
            last_update: None,
            clock,
        }
    }

    // ========================================================================
    // Update
    // ========================================================================

    /// Process one telemetry frame.
    ///
    /// A frame without cars, or without our car, is rejected and leaves the
    /// twin untouched apart from `frames_rejected`.
    pub fn update_state(&mut self, frame: &TelemetryFrame) -> Result<(), TwinError> {
        if frame.cars.is_empty() {
            return Err(self.reject(TwinError::NoCars));
        }
        let Some(our_car) = frame.find_car(&self.our_car_id) else {
            return Err(self.reject(TwinError::OurCarMissing {
                car_id: self.our_car_id.clone(),
            }));
        };

        let now = self.clock.now();
        let previous_status = self.context.track_status;

        // Race context
        if let Some(lap) = frame.lap {
            self.context.current_lap = lap;
        }
        if let Some(session) = frame.session_type {
            self.context.session_type = session;
        }
        if let Some(status) = frame.track_conditions.track_status {
            self.context.track_status = status;
        }

        // Our car
        if let Some(position) = our_car.position {
            self.context.our_position = position;
        }
        self.context.our_gap_to_leader = match frame.leader() {
            Some(leader) if leader.car_id != self.our_car_id => {
                let leader_time = leader.lap_time.unwrap_or(0.0);
                our_car.lap_time.unwrap_or(leader_time) - leader_time
            }
            _ => 0.0,
        };

        // Competitors
        let lap = self.context.current_lap;
        let total_laps = self.context.total_laps;
        let our_position = self.context.our_position;
        let our_gap = self.context.our_gap_to_leader;
        for snapshot in &frame.cars {
            if snapshot.car_id.is_empty() || snapshot.car_id == self.our_car_id {
                continue;
            }
            let idx = self.competitor_index(snapshot);
            let competitor = &mut self.competitors[idx];
            competitor.update_state(snapshot, lap, now);

            let gap = if competitor.position() <= 1 {
                0.0
            } else {
                f64::from(competitor.position() - 1) * GAP_PER_POSITION_SECS
            };
            competitor.set_gap_to_leader(gap);
            competitor.calculate_pit_probability(lap, total_laps);
            competitor.assess_strategic_threat(our_position, gap - our_gap);
        }

        self.detect_race_events(previous_status, now);

        if self.throttle.try_acquire(now) {
            self.scan_strategic_opportunities();
        }

        self.update_count += 1;
        self.last_update = Some(now);
        Ok(())
    }

    fn reject(&mut self, err: TwinError) -> TwinError {
        self.frames_rejected += 1;
        warn!(error = %err, rejected = self.frames_rejected, "Telemetry frame rejected");
        err
    }

    fn competitor_index(&mut self, snapshot: &crate::types::CarSnapshot) -> usize {
        if let Some(&idx) = self.index.get(&snapshot.car_id) {
            return idx;
        }
        let idx = self.competitors.len();
        self.competitors.push(CompetitorModel::from_snapshot(snapshot, self.limits));
        self.index.insert(snapshot.car_id.clone(), idx);
        debug!(car_id = %snapshot.car_id, "Tracking new competitor");
        idx
    }

    // ========================================================================
    // Event Detection
    // ========================================================================

    fn detect_race_events(&mut self, previous_status: TrackStatus, now: DateTime<Utc>) {
        let lap = self.context.current_lap;
        let status = self.context.track_status;

        if status != previous_status {
            info!(old = %previous_status, new = %status, lap, "Track status changed");
            self.race_events.push(RaceEvent::new(
                now,
                lap,
                RaceEventKind::TrackStatusChange {
                    old_status: previous_status,
                    new_status: status,
                },
            ));

            if status.is_neutralized() {
                self.trigger_resimulation(ResimulationTrigger::SafetyCar, None, now);
            } else if status == TrackStatus::Green && previous_status.is_neutralized() {
                let restart = StrategicOpportunity::new(
                    OpportunityType::RestartOpportunity,
                    FIELD_TARGET,
                    0.6,
                    lap,
                    "Race restart - positioning opportunity",
                )
                .with_duration(3);
                self.inject_opportunity(restart);
            }
        }

        let recency = seconds(self.config.pit_stop_recency_secs);
        let mut fresh_stops: Vec<(String, PitStopRecord)> = Vec::new();
        for competitor in &self.competitors {
            let count = competitor.pit_stops().len();
            let announced = self.announced_pit_stops.get(competitor.car_id()).copied().unwrap_or(0);
            if count <= announced {
                continue;
            }
            self.announced_pit_stops.insert(competitor.car_id().to_string(), count);
            if let Some(stop) = competitor.last_pit_stop() {
                if now - stop.timestamp < recency {
                    fresh_stops.push((competitor.car_id().to_string(), stop.clone()));
                }
            }
        }

        for (car_id, stop) in fresh_stops {
            self.race_events.push(RaceEvent::new(
                stop.timestamp,
                stop.lap,
                RaceEventKind::CompetitorPitStop {
                    car_id: car_id.clone(),
                    pit_data: stop,
                },
            ));
            self.trigger_resimulation(ResimulationTrigger::PitStop, Some(car_id), now);
        }
    }

    fn trigger_resimulation(
        &mut self,
        trigger: ResimulationTrigger,
        car_id: Option<String>,
        now: DateTime<Utc>,
    ) {
        let lap = self.context.current_lap;
        let impact = self.assess_event_impact(trigger, car_id.as_deref());
        info!(trigger = %trigger, lap, impact = %impact, car_id = ?car_id, "Re-simulation triggered");

        self.race_events.push(RaceEvent::new(
            now,
            lap,
            RaceEventKind::ResimulationTriggered {
                trigger_event: trigger,
                car_id: car_id.clone(),
                strategic_impact: impact,
            },
        ));

        match trigger {
            ResimulationTrigger::SafetyCar => {
                self.inject_opportunity(StrategicOpportunity::new(
                    OpportunityType::SafetyCarOpportunity,
                    FIELD_TARGET,
                    0.9,
                    lap,
                    "Safety car pit window - free pit stop opportunity",
                ));
            }
            ResimulationTrigger::PitStop => {
                let Some(car_id) = car_id else { return };
                let threatening = self
                    .get_competitor(&car_id)
                    .is_some_and(|c| c.threat_level() >= ThreatLevel::Medium);
                if threatening {
                    let reasoning = format!("Response to {car_id} pit stop - maintain track position");
                    self.inject_opportunity(StrategicOpportunity::new(
                        OpportunityType::PitResponse,
                        car_id,
                        0.7,
                        lap.saturating_add(1),
                        reasoning,
                    ));
                } else {
                    self.prune_stale_opportunities();
                }
            }
        }
    }

    /// Strategic impact of an event that triggers re-simulation
    pub fn assess_event_impact(&self, trigger: ResimulationTrigger, car_id: Option<&str>) -> RiskLevel {
        match trigger {
            ResimulationTrigger::SafetyCar => RiskLevel::Critical,
            ResimulationTrigger::PitStop => {
                match car_id.and_then(|id| self.get_competitor(id)).map(CompetitorModel::threat_level) {
                    Some(ThreatLevel::High | ThreatLevel::Critical) => RiskLevel::High,
                    Some(ThreatLevel::Medium) => RiskLevel::Medium,
                    _ => RiskLevel::Low,
                }
            }
        }
    }

    /// Put an event-driven opportunity at the head of the list, then drop
    /// stale entries and re-apply the cap.
    fn inject_opportunity(&mut self, opportunity: StrategicOpportunity) {
        debug!(kind = %opportunity.opportunity_type, target = %opportunity.target_car, "Injecting opportunity");
        self.strategic_opportunities.insert(0, opportunity);
        self.prune_stale_opportunities();
        self.strategic_opportunities.truncate(self.config.max_opportunities);
    }

    fn prune_stale_opportunities(&mut self) {
        let lap = self.context.current_lap;
        self.strategic_opportunities.retain(|o| !o.is_stale(lap));
    }

    // ========================================================================
    // Opportunity Rescan
    // ========================================================================

    /// Rebuild the opportunity list from the current competitor states.
    ///
    /// Runs after event detection, so a rescan due in the same frame as a
    /// safety car or pit stop replaces the opportunity that event injected.
    pub fn scan_strategic_opportunities(&mut self) {
        let ctx = &self.context;
        let mut found = Vec::new();

        for c in &self.competitors {
            let profile = c.behavioral_profile();
            let threat = c.threat_level();

            if c.pit_probability() > 0.6 && matches!(threat, ThreatLevel::Medium | ThreatLevel::High) {
                found.push(StrategicOpportunity::new(
                    OpportunityType::UndercutWindow,
                    c.car_id(),
                    (c.pit_probability() * profile.undercut_tendency).min(0.9),
                    ctx.current_lap.saturating_add(1).max(1),
                    format!("High pit probability ({:.2}) for {}", c.pit_probability(), c.car_id()),
                ));
            }

            if c.tire_age() > 15 && c.pit_probability() < 0.3 && threat != ThreatLevel::Low {
                found.push(StrategicOpportunity::new(
                    OpportunityType::OvercutWindow,
                    c.car_id(),
                    0.6,
                    ctx.current_lap.saturating_add(3),
                    format!("Old tires ({} laps) but low pit probability", c.tire_age()),
                ));
            }

            let gap = (c.gap_to_leader() - ctx.our_gap_to_leader).abs();
            let adjacent = c.position().abs_diff(ctx.our_position) == 1;
            if gap < 1.0 && adjacent && ctx.track_status == TrackStatus::Green {
                found.push(StrategicOpportunity::new(
                    OpportunityType::DrsOvertake,
                    c.car_id(),
                    0.4,
                    ctx.current_lap,
                    format!("Close gap ({gap:.1}s) and adjacent position"),
                ));
            }
        }

        found.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        found.truncate(self.config.max_opportunities);
        debug!(count = found.len(), lap = ctx.current_lap, "Opportunity rescan complete");
        self.strategic_opportunities = found;
    }

    // ========================================================================
    // Read Access
    // ========================================================================

    /// Serializable snapshot. Reading never mutates the twin.
    pub fn current_state(&self) -> FieldTwinState {
        let keep = self.config.recent_events_len;
        let skip = self.race_events.len().saturating_sub(keep);
        FieldTwinState {
            timestamp: self.last_update.unwrap_or(self.created_at),
            twin_id: self.twin_id.clone(),
            competitors: self.competitors.iter().map(CompetitorModel::state).collect(),
            strategic_opportunities: self.strategic_opportunities.clone(),
            race_context: self.context.clone(),
            recent_events: self.race_events[skip..].to_vec(),
            metrics: TwinMetrics {
                update_count: self.update_count,
                frames_rejected: self.frames_rejected,
                competitor_count: self.competitors.len(),
                total_events: self.race_events.len(),
                last_update: self.last_update,
            },
        }
    }

    pub fn get_competitor(&self, car_id: &str) -> Option<&CompetitorModel> {
        self.index.get(car_id).map(|&idx| &self.competitors[idx])
    }

    /// Competitors in first-seen order
    pub fn competitors(&self) -> &[CompetitorModel] {
        &self.competitors
    }

    pub fn competitor_count(&self) -> usize {
        self.competitors.len()
    }

    pub fn strategic_opportunities(&self) -> &[StrategicOpportunity] {
        &self.strategic_opportunities
    }

    pub fn race_events(&self) -> &[RaceEvent] {
        &self.race_events
    }

    pub fn race_context(&self) -> &RaceContext {
        &self.context
    }

    pub fn twin_id(&self) -> &str {
        &self.twin_id
    }

    pub fn our_car_id(&self) -> &str {
        &self.our_car_id
    }

    pub fn config(&self) -> &FieldTwinConfig {
        &self.config
    }

    pub fn update_count(&self) -> u64 {
        self.update_count
    }

    pub fn frames_rejected(&self) -> u64 {
        self.frames_rejected
    }

    pub fn last_update(&self) -> Option<DateTime<Utc>> {
        self.last_update
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
