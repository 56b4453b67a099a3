//! Race Configuration Module
//!
//! Per-session configuration loaded from TOML files. Every threshold the
//! Field Twin depends on (our car id, scan interval, history sizes) lives here
//! and is handed to constructors explicitly; nothing reads configuration from
//! global state.
//!
//! ## Loading Order
//!
//! 1. `RACE_TWIN_CONFIG` environment variable (path to TOML file)
//! 2. `race_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! ## Usage
//!
//! ```ignore
//! let config = RaceConfig::load();
//! let twin = FieldTwin::new(&config, Arc::new(SystemClock));
//! ```

mod race_config;
pub mod defaults;

pub use race_config::*;
