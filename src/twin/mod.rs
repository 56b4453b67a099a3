//! Field Twin - competitor modeling and strategic opportunity engine
//!
//! ## Architecture
//!
//! ```text
//! TelemetryFrame ─► FieldTwin::update_state
//!                     ├─ race context (lap, status, our position / gap)
//!                     ├─ CompetitorModel::update_state  (one per car id)
//!                     │    └─ pit probability + threat vs our car
//!                     ├─ event detection (flag changes, inferred pit stops)
//!                     │    └─ event-driven opportunity injection + pruning
//!                     └─ throttled opportunity rescan (ScanThrottle)
//!
//! FieldTwin::predict            multi-lap forecasts (pure read)
//! FieldTwin::current_state      serializable snapshot (pure read)
//! FieldTwin::handle_*           on-demand analysis helpers (pure read)
//! ```
//!
//! All wall-clock decisions use the injected `Clock`.

mod analysis;
mod competitor;
mod field;
mod prediction;
mod throttle;

pub use analysis::*;
pub use competitor::*;
pub use field::*;
pub use prediction::*;
pub use throttle::ScanThrottle;
pub(crate) use throttle::seconds;

use thiserror::Error;

/// Frame-level failures. Both are recoverable: the frame is skipped and the
/// twin keeps its previous state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TwinError {
    #[error("Telemetry frame contains no cars")]
    NoCars,

    #[error("Our car '{car_id}' not found in telemetry frame")]
    OurCarMissing { car_id: String },
}
