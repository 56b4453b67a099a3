//! Race Twin - Field Twin telemetry replay
//!
//! Replays JSON-lines telemetry through the Field Twin and prints the final
//! strategic analysis and predictions.
//!
//! # Usage
//!
//! ```bash
//! # Replay a recorded session
//! race-twin --input session.jsonl --horizon 600
//!
//! # Pipe live frames, summarizing every 10 s
//! telemetry-feed | race-twin --our-car 16 --summary-interval 10
//! ```
//!
//! # Environment Variables
//!
//! - `RACE_TWIN_CONFIG`: Path to race_config.toml (when `--config` is absent)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use race_twin::config::defaults::{REPLAY_HORIZON_SECS, REPLAY_SUMMARY_INTERVAL_SECS};
use race_twin::telemetry::parse_frame;
use race_twin::{HpcOrchestrator, ManualClock, RaceConfig, SharedTwin};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "race-twin")]
#[command(about = "Field Twin competitor modeling - telemetry replay")]
#[command(version)]
struct CliArgs {
    /// JSON-lines telemetry file (reads stdin when absent)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Race configuration TOML (otherwise RACE_TWIN_CONFIG, then ./race_config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override our car id from the config
    #[arg(long, value_name = "ID")]
    our_car: Option<String>,

    /// Seconds between periodic summaries (0 disables)
    #[arg(long, default_value_t = REPLAY_SUMMARY_INTERVAL_SECS)]
    summary_interval: u64,

    /// Prediction horizon for the final report (seconds)
    #[arg(long, default_value_t = REPLAY_HORIZON_SECS)]
    horizon: u64,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }
}

fn load_config(args: &CliArgs) -> Result<RaceConfig> {
    let mut config = match &args.config {
        Some(path) => RaceConfig::load_from_file(path)
            .with_context(|| format!("Failed to load race config from {}", path.display()))?,
        None => RaceConfig::load(),
    };
    if let Some(car) = &args.our_car {
        config.race.our_car_id = car.clone();
    }
    config.validate().context("Invalid race configuration")?;
    Ok(config)
}

// ============================================================================
// Replay
// ============================================================================

#[derive(Debug, Default)]
struct ReplayStats {
    lines: u64,
    accepted: u64,
    invalid: u64,
    rejected: u64,
}

/// Feed every line to the twin. Frames carrying a timestamp move the clock to
/// it; untimed frames use the wall clock.
async fn replay<R>(reader: R, twin: &SharedTwin, clock: &ManualClock) -> Result<ReplayStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = ReplayStats::default();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await.context("Failed to read telemetry")? {
        stats.lines += 1;
        if line.trim().is_empty() {
            continue;
        }

        let frame = match parse_frame(&line) {
            Ok(frame) => frame,
            Err(e) => {
                stats.invalid += 1;
                warn!(line = stats.lines, error = %e, "Skipping invalid telemetry line");
                continue;
            }
        };

        clock.set(frame.timestamp.unwrap_or_else(Utc::now));
        match twin.ingest(&frame) {
            Ok(_) => stats.accepted += 1,
            Err(e) => {
                stats.rejected += 1;
                warn!(line = stats.lines, error = %e, "Frame skipped");
            }
        }
    }

    Ok(stats)
}

fn spawn_summary_task(twin: Arc<SharedTwin>, every: Duration, cancel_token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        interval.tick().await;
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => break,
                _ = interval.tick() => {
                    let snap = twin.snapshot();
                    let analysis = &snap.analysis;
                    info!(
                        lap = snap.state.race_context.current_lap,
                        competitors = snap.state.competitors.len(),
                        opportunities = analysis.opportunities.len(),
                        risk = %analysis.threat_assessment.overall_risk_level,
                        avg_update_ms = snap.performance.average_update_ms,
                        "Field twin summary"
                    );
                }
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();
    init_logging(args.json_logs);

    let config = load_config(&args)?;
    info!(
        our_car = %config.race.our_car_id,
        total_laps = config.race.total_laps,
        twin_id = %config.race.twin_id,
        "Race Twin starting"
    );

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let twin = Arc::new(SharedTwin::new(HpcOrchestrator::new(&config, clock.clone())));

    let cancel_token = CancellationToken::new();
    let summary = (args.summary_interval > 0).then(|| {
        spawn_summary_task(
            Arc::clone(&twin),
            Duration::from_secs(args.summary_interval),
            cancel_token.clone(),
        )
    });

    let stats = match &args.input {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("Failed to open {}", path.display()))?;
            replay(BufReader::new(file), &twin, &clock).await?
        }
        None => replay(BufReader::new(tokio::io::stdin()), &twin, &clock).await?,
    };

    cancel_token.cancel();
    if let Some(handle) = summary {
        handle.await.context("Summary task failed")?;
    }

    info!(
        lines = stats.lines,
        accepted = stats.accepted,
        invalid = stats.invalid,
        rejected = stats.rejected,
        "Replay complete"
    );

    let snapshot = twin.snapshot();
    let report = serde_json::json!({
        "analysis": snapshot.analysis,
        "performance": snapshot.performance,
        "predictions": twin.predict(args.horizon),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
