//! Headless end-to-end simulation
//!
//! Runs the full monitor pipeline against an in-memory sensor bank and a
//! scripted arrival/departure scenario, with the real HTTP client pointed
//! at a local mock endpoint. Start `mock_thingspeak` first:
//!
//!   cargo run --bin mock_thingspeak -- --port 8080
//!   cargo run --bin sim -- --telemetry-url http://127.0.0.1:8080/update
//!
//! The scenario exercises the interesting paths: a single settled change,
//! rapid flapping that keeps restarting the settle window, and a quiet
//! stretch long enough for the cooldown to drain.

use clap::Parser;
use parkwatch::domain::types::SensorLevel;
use parkwatch::infra::Metrics;
use parkwatch::io::{ConsolePanel, SimulatedSensorArray, ThingSpeakClient};
use parkwatch::services::{DisplayLoop, ReportLoop, ReportShared, TelemetryReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "sim")]
#[command(about = "Scripted end-to-end simulation of the lot monitor")]
struct Args {
    /// Telemetry endpoint (point this at mock_thingspeak)
    #[arg(long, default_value = "http://127.0.0.1:8080/update")]
    telemetry_url: String,

    /// API key sent with each update
    #[arg(long, default_value = "SIMKEY")]
    api_key: String,
}

/// One scripted lot event: wait, then set a slot's level.
struct Step {
    after_ms: u64,
    slot: usize,
    level: SensorLevel,
}

const SCENARIO: &[Step] = &[
    // A vehicle arrives in slot 3 and settles
    Step { after_ms: 500, slot: 3, level: SensorLevel::Blocked },
    // Quiet long enough to settle and report, then slot 6 fills
    Step { after_ms: 5000, slot: 6, level: SensorLevel::Blocked },
    // Flapping: slot 2 toggles three times 1 s apart, holding reports back
    Step { after_ms: 4000, slot: 2, level: SensorLevel::Blocked },
    Step { after_ms: 1000, slot: 2, level: SensorLevel::Clear },
    Step { after_ms: 1000, slot: 2, level: SensorLevel::Blocked },
    // Slot 3 frees up while the flap settles
    Step { after_ms: 4000, slot: 3, level: SensorLevel::Clear },
];

/// Trailing quiet period so the last change settles and reports.
const DRAIN_MS: u64 = 7000;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    let args = Args::parse();
    info!(telemetry_url = %args.telemetry_url, "sim starting");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let metrics = Arc::new(Metrics::new());
    let shared = Arc::new(ReportShared::new());
    let sensors = SimulatedSensorArray::new();

    let transport = Arc::new(ThingSpeakClient::new(
        &args.telemetry_url,
        &args.api_key,
        Duration::from_secs(5),
    )?);

    let (display_loop, sample_rx) = DisplayLoop::new(
        Arc::new(sensors.clone()),
        Box::new(ConsolePanel::new()),
        shared.clone(),
        metrics.clone(),
    );
    let display_handle = tokio::spawn(display_loop.run(shutdown_rx.clone()));

    let reporter = TelemetryReporter::new(transport, shared.clone(), metrics.clone());
    let report_loop = ReportLoop::new(shared, reporter, sample_rx, metrics.clone());
    let report_handle = tokio::spawn(report_loop.run(shutdown_rx));

    // Drive the scripted scenario
    for step in SCENARIO {
        tokio::time::sleep(Duration::from_millis(step.after_ms)).await;
        info!(slot = step.slot, level = step.level.as_str(), "sim_lot_event");
        sensors.set(step.slot, step.level);
    }

    tokio::time::sleep(Duration::from_millis(DRAIN_MS)).await;

    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(display_handle, report_handle);

    metrics.report().log();
    info!("sim complete");
    Ok(())
}
