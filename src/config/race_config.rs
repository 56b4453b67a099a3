//! Race Configuration - Field Twin tunables as operator-editable TOML values
//!
//! Each struct implements `Default` with values matching `config::defaults`,
//! so a session without a config file behaves exactly like the stock twin.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "RACE_TWIN_CONFIG";

/// Config file looked up in the working directory
pub const LOCAL_CONFIG_FILE: &str = "race_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for one race session.
///
/// Load with `RaceConfig::load()` which searches:
/// 1. `$RACE_TWIN_CONFIG`
/// 2. `./race_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RaceConfig {
    /// Race / car identification
    #[serde(default)]
    pub race: RaceInfo,

    /// Field Twin timing and buffer sizes
    #[serde(default)]
    pub field_twin: FieldTwinConfig,

    /// Update-time budget
    #[serde(default)]
    pub performance: PerformanceConfig,
}

impl RaceConfig {
    /// Load configuration using the standard search order:
    /// 1. `$RACE_TWIN_CONFIG` environment variable
    /// 2. `./race_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), our_car = %config.race.our_car_id, "Loaded race config from RACE_TWIN_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from RACE_TWIN_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "RACE_TWIN_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(our_car = %config.race.our_car_id, "Loaded race config from ./race_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./race_config.toml, using defaults");
                }
            }
        }

        info!("No race config found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are logged as warnings and never fail the load.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        for key in unknown_keys(&contents) {
            warn!(key = %key, path = %path.display(), "Unknown config key ignored");
        }

        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the twin cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.race.our_car_id.trim().is_empty() {
            errors.push("race.our_car_id: must not be empty".to_string());
        }
        if self.race.total_laps == 0 {
            errors.push("race.total_laps: must be > 0".to_string());
        }

        let ft = &self.field_twin;
        if ft.lap_history_len == 0 {
            errors.push("field_twin.lap_history_len: must be > 0".to_string());
        }
        if ft.position_history_len == 0 {
            errors.push("field_twin.position_history_len: must be > 0".to_string());
        }
        if ft.max_opportunities == 0 {
            errors.push("field_twin.max_opportunities: must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Race Info
// ============================================================================

/// Identification of the session and of our car
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RaceInfo {
    /// Car id of our car; every other car is a competitor
    #[serde(default = "default_our_car_id")]
    pub our_car_id: String,

    /// Scheduled race distance (laps)
    #[serde(default = "default_total_laps")]
    pub total_laps: u32,

    /// Identifier stamped on exported state
    #[serde(default = "default_twin_id")]
    pub twin_id: String,
}

fn default_our_car_id() -> String {
    defaults::OUR_CAR_ID.to_string()
}
fn default_total_laps() -> u32 {
    defaults::TOTAL_LAPS
}
fn default_twin_id() -> String {
    defaults::TWIN_ID.to_string()
}

impl Default for RaceInfo {
    fn default() -> Self {
        Self {
            our_car_id: default_our_car_id(),
            total_laps: default_total_laps(),
            twin_id: default_twin_id(),
        }
    }
}

// ============================================================================
// Field Twin Config
// ============================================================================

/// Wall-clock gates and buffer sizes for the Field Twin
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldTwinConfig {
    /// Minimum seconds between opportunity rescans
    #[serde(default = "default_scan_interval")]
    pub opportunity_scan_interval_secs: u64,

    /// Pit stops younger than this are reported as race events (seconds)
    #[serde(default = "default_pit_recency")]
    pub pit_stop_recency_secs: u64,

    /// Lap-time history capacity per competitor
    #[serde(default = "default_lap_history_len")]
    pub lap_history_len: usize,

    /// Position history capacity per competitor
    #[serde(default = "default_position_history_len")]
    pub position_history_len: usize,

    /// Cap on the strategic opportunity list
    #[serde(default = "default_max_opportunities")]
    pub max_opportunities: usize,

    /// Events included in exported state
    #[serde(default = "default_recent_events_len")]
    pub recent_events_len: usize,

    /// Events younger than this feed on-demand opportunity detection (seconds)
    #[serde(default = "default_event_window")]
    pub event_opportunity_window_secs: u64,
}

fn default_scan_interval() -> u64 { defaults::OPPORTUNITY_SCAN_INTERVAL_SECS }
fn default_pit_recency() -> u64 { defaults::PIT_STOP_RECENCY_SECS }
fn default_lap_history_len() -> usize { defaults::LAP_HISTORY_LEN }
fn default_position_history_len() -> usize { defaults::POSITION_HISTORY_LEN }
fn default_max_opportunities() -> usize { defaults::MAX_OPPORTUNITIES }
fn default_recent_events_len() -> usize { defaults::RECENT_EVENTS_LEN }
fn default_event_window() -> u64 { defaults::EVENT_OPPORTUNITY_WINDOW_SECS }

impl Default for FieldTwinConfig {
    fn default() -> Self {
        Self {
            opportunity_scan_interval_secs: default_scan_interval(),
            pit_stop_recency_secs: default_pit_recency(),
            lap_history_len: default_lap_history_len(),
            position_history_len: default_position_history_len(),
            max_opportunities: default_max_opportunities(),
            recent_events_len: default_recent_events_len(),
            event_opportunity_window_secs: default_event_window(),
        }
    }
}

// ============================================================================
// Performance Config
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceConfig {
    /// Updates slower than this are logged as warnings (ms)
    #[serde(default = "default_max_update_time")]
    pub max_update_time_ms: u64,
}

fn default_max_update_time() -> u64 {
    defaults::MAX_UPDATE_TIME_MS
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            max_update_time_ms: default_max_update_time(),
        }
    }
}

// ============================================================================
// Unknown-key detection
// ============================================================================

fn known_config_keys() -> HashSet<&'static str> {
    [
        "race",
        "race.our_car_id",
        "race.total_laps",
        "race.twin_id",
        "field_twin",
        "field_twin.opportunity_scan_interval_secs",
        "field_twin.pit_stop_recency_secs",
        "field_twin.lap_history_len",
        "field_twin.position_history_len",
        "field_twin.max_opportunities",
        "field_twin.recent_events_len",
        "field_twin.event_opportunity_window_secs",
        "performance",
        "performance.max_update_time_ms",
    ]
    .into_iter()
    .collect()
}

fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

/// Dotted key paths present in `raw_toml` that `RaceConfig` does not know.
///
/// Unparseable input yields no keys; serde reports the parse error instead.
pub fn unknown_keys(raw_toml: &str) -> Vec<String> {
    let Ok(value) = raw_toml.parse::<toml::Value>() else {
        return Vec::new();
    };
    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|k| !known.contains(k.as_str()))
        .collect()
}
