//! The two scheduled activities driving the lot monitor
//!
//! DisplayLoop (200 ms): sample -> debounce -> publish -> aggregate ->
//! render. It is the single sampling authority; every captured sample is
//! published through a watch channel so the report path never reads the
//! pins itself and the two paths cannot disagree about the lot state.
//!
//! ReportLoop (1000 ms): evaluate the gate, and on admission run one
//! report attempt against the most recently published sample. A slow
//! network call delays only this loop's own cadence.
//!
//! Both run until the shutdown watch channel flips, the only teardown
//! the process has.

use crate::domain::types::SensorSample;
use crate::infra::metrics::Metrics;
use crate::io::display::StatusDisplay;
use crate::io::sensors::SensorArray;
use crate::services::debounce::ChangeDebouncer;
use crate::services::occupancy::zone_counts;
use crate::services::report_gate::{GateDecision, ReportShared};
use crate::services::reporter::TelemetryReporter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{interval, Instant};
use tracing::{info, trace};

/// Display refresh cadence.
pub const DISPLAY_REFRESH: Duration = Duration::from_millis(200);

/// Report gate evaluation cadence; bounds the worst-case latency between
/// cooldown expiry and the next attempt.
pub const REPORT_TICK: Duration = Duration::from_millis(1000);

pub struct DisplayLoop {
    sensors: Arc<dyn SensorArray>,
    display: Box<dyn StatusDisplay>,
    debouncer: ChangeDebouncer,
    sample_tx: watch::Sender<SensorSample>,
    metrics: Arc<Metrics>,
}

impl DisplayLoop {
    /// Primes the debouncer and the watch channel with one startup
    /// sample, so the first tick reports no phantom change. Returns the
    /// receiver end for the report path.
    pub fn new(
        sensors: Arc<dyn SensorArray>,
        display: Box<dyn StatusDisplay>,
        shared: Arc<ReportShared>,
        metrics: Arc<Metrics>,
    ) -> (Self, watch::Receiver<SensorSample>) {
        let initial = sensors.sample();
        let (sample_tx, sample_rx) = watch::channel(initial);
        let debouncer = ChangeDebouncer::new(initial, shared);

        (Self { sensors, display, debouncer, sample_tx, metrics }, sample_rx)
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(refresh_ms = DISPLAY_REFRESH.as_millis() as u64, "display_loop_started");
        let mut ticker = interval(DISPLAY_REFRESH);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("display_loop_shutdown");
                        return;
                    }
                }
                _ = ticker.tick() => {}
            }

            let sample = self.sensors.sample();
            self.metrics.record_sample();

            if self.debouncer.observe(&sample, sample.captured_at) {
                info!(levels = %sample, "sensor_change_detected");
                self.metrics.record_change();
            }

            // Publish before rendering: the report path must never see a
            // sample older than what the panel shows
            let _ = self.sample_tx.send(sample);

            let counts = zone_counts(&sample);
            self.metrics.set_occupancy(counts.free_a, counts.free_b);
            self.display.render(&counts);
        }
    }
}

pub struct ReportLoop {
    shared: Arc<ReportShared>,
    reporter: TelemetryReporter,
    sample_rx: watch::Receiver<SensorSample>,
    metrics: Arc<Metrics>,
}

impl ReportLoop {
    pub fn new(
        shared: Arc<ReportShared>,
        reporter: TelemetryReporter,
        sample_rx: watch::Receiver<SensorSample>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { shared, reporter, sample_rx, metrics }
    }

    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!(tick_ms = REPORT_TICK.as_millis() as u64, "report_loop_started");
        let mut ticker = interval(REPORT_TICK);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("report_loop_shutdown");
                        return;
                    }
                }
                _ = ticker.tick() => {}
            }

            let decision = self.shared.evaluate(Instant::now());
            match decision {
                GateDecision::Idle => {}
                GateDecision::Settling | GateDecision::Cooldown => {
                    trace!(gate = decision.as_str(), "report_gate_holding");
                }
                GateDecision::Admit => {
                    let sample = *self.sample_rx.borrow_and_update();
                    self.reporter.attempt(&sample).await;
                }
            }

            self.metrics.set_pending(self.shared.pending());
        }
    }
}
