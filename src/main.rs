//! parkwatch - lot occupancy monitor and telemetry reporter
//!
//! Polls the 8-slot beam sensor bank, keeps the occupancy panel current,
//! and pushes debounced state changes to the telemetry endpoint under a
//! settle + cooldown policy.
//!
//! Module structure:
//! - `domain/` - Core value types (samples, zone counts, wire fields)
//! - `io/` - External interfaces (sensors, display, telemetry, metrics HTTP)
//! - `services/` - Coordination logic (debounce, gate, reporter, loops)
//! - `infra/` - Infrastructure (config, metrics)

use clap::Parser;
use parkwatch::infra::{Config, Metrics};
use parkwatch::io::{ConsolePanel, GpioSensorArray, NullPanel, StatusDisplay, ThingSpeakClient};
use parkwatch::services::{DisplayLoop, ReportLoop, ReportShared, TelemetryReporter};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// parkwatch - parking lot occupancy monitor
#[derive(Parser, Debug)]
#[command(name = "parkwatch", version, about)]
struct Args {
    /// Path to TOML configuration file (falls back to CONFIG_FILE env,
    /// then config/dev.toml)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured logging with configurable level via RUST_LOG env var
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!(build = env!("GIT_HASH"), "parkwatch starting");

    let args = Args::parse();
    let config_path = args.config.unwrap_or_else(Config::resolve_config_path);
    let config = Config::load_from_path(&config_path);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        gpio_pins = ?config.gpio_pins(),
        telemetry_url = %config.telemetry_url(),
        telemetry_timeout_ms = %config.telemetry_timeout_ms(),
        display_enabled = %config.display_enabled(),
        metrics_interval_secs = %config.metrics_interval_secs(),
        prometheus_port = %config.prometheus_port(),
        "config_loaded"
    );

    // Create shutdown signal
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Shared components
    let metrics = Arc::new(Metrics::new());
    let shared = Arc::new(ReportShared::new());
    let sensors = Arc::new(GpioSensorArray::new(config.gpio_pins()));

    let display: Box<dyn StatusDisplay> = if config.display_enabled() {
        Box::new(ConsolePanel::new())
    } else {
        Box::new(NullPanel)
    };

    let transport = Arc::new(ThingSpeakClient::new(
        config.telemetry_url(),
        config.telemetry_api_key(),
        Duration::from_millis(config.telemetry_timeout_ms()),
    )?);

    // Display path: the single sampling authority
    let (display_loop, sample_rx) =
        DisplayLoop::new(sensors, display, shared.clone(), metrics.clone());
    let display_shutdown = shutdown_rx.clone();
    let display_handle = tokio::spawn(async move {
        display_loop.run(display_shutdown).await;
    });

    // Report path
    let reporter = TelemetryReporter::new(transport, shared.clone(), metrics.clone());
    let report_loop = ReportLoop::new(shared, reporter, sample_rx, metrics.clone());
    let report_shutdown = shutdown_rx.clone();
    let report_handle = tokio::spawn(async move {
        report_loop.run(report_shutdown).await;
    });

    // Periodic metrics summary (lock-free reads)
    let metrics_clone = metrics.clone();
    let metrics_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(metrics_interval));
        loop {
            interval.tick().await;
            metrics_clone.report().log();
        }
    });

    // Prometheus metrics HTTP server (if port > 0)
    let prometheus_port = config.prometheus_port();
    if prometheus_port > 0 {
        let prom_metrics = metrics.clone();
        let prom_site = config.site_id().to_string();
        let prom_shutdown = shutdown_rx.clone();
        tokio::spawn(async move {
            if let Err(e) = parkwatch::io::prometheus::start_metrics_server(
                prometheus_port,
                prom_metrics,
                prom_site,
                prom_shutdown,
            )
            .await
            {
                tracing::error!(error = %e, "Prometheus metrics server error");
            }
        });
    }

    // Handle shutdown on Ctrl+C
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    // Run until both loops observe the shutdown signal
    let _ = tokio::join!(display_handle, report_handle);

    info!("parkwatch shutdown complete");
    Ok(())
}
