//! Concurrent ingestion around the orchestrator
//!
//! ```text
//! ingest(frame) ─► Mutex<HpcOrchestrator> ─► TwinSnapshot ─► ArcSwap
//!                        (single writer)                       │
//! snapshot() ◄─────────────────────────────────────────────────┘ (lock-free)
//! ```

mod shared;

pub use shared::{SharedTwin, TwinSnapshot};
