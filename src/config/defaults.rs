//! System-wide default constants.
//!
//! Every `RaceConfig` field defaults to one of these, so a missing
//! `race_config.toml` yields the stock Field Twin behavior.

// ============================================================================
// Race
// ============================================================================

/// Car id treated as "our car" when none is configured.
pub const OUR_CAR_ID: &str = "44";

/// Race distance assumed when none is configured (laps).
pub const TOTAL_LAPS: u32 = 50;

/// Identifier stamped on exported state and predictions.
pub const TWIN_ID: &str = "field_twin";

// ============================================================================
// Field Twin
// ============================================================================

/// Minimum wall-clock time between opportunity rescans (seconds).
pub const OPPORTUNITY_SCAN_INTERVAL_SECS: u64 = 15;

/// A competitor pit stop younger than this is reported as a race event (seconds).
pub const PIT_STOP_RECENCY_SECS: u64 = 10;

/// Lap-time ring-buffer capacity per competitor.
pub const LAP_HISTORY_LEN: usize = 20;

/// Position ring-buffer capacity per competitor.
pub const POSITION_HISTORY_LEN: usize = 50;

/// Strategic opportunities kept after a rescan or injection.
pub const MAX_OPPORTUNITIES: usize = 5;

/// Race events included in exported state.
pub const RECENT_EVENTS_LEN: usize = 10;

/// Events younger than this feed on-demand opportunity detection (seconds).
pub const EVENT_OPPORTUNITY_WINDOW_SECS: u64 = 60;

// ============================================================================
// Performance
// ============================================================================

/// Update-time warning threshold (ms).
pub const MAX_UPDATE_TIME_MS: u64 = 500;

// ============================================================================
// Replay
// ============================================================================

/// Default prediction horizon printed at the end of a replay (seconds).
pub const REPLAY_HORIZON_SECS: u64 = 300;

/// Default interval between periodic replay summaries (seconds).
pub const REPLAY_SUMMARY_INTERVAL_SECS: u64 = 30;
