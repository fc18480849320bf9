//! Lock-free metrics collection and periodic reporting
//!
//! Uses atomics so the two loops never contend on a lock for counters.
//! All atomics use Relaxed ordering intentionally - these are statistical
//! counters only. Do NOT use them for coordination or logic decisions;
//! the report gate has its own synchronized cell.

use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Update an atomic max value using a compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

/// Lock-free metrics collector for the display and report loops
pub struct Metrics {
    /// Sensor samples taken (monotonic)
    samples_total: AtomicU64,
    /// Debounced sensor changes detected (monotonic)
    changes_total: AtomicU64,
    /// Report attempts reaching the transport (monotonic)
    attempts_total: AtomicU64,
    /// Attempts confirmed by the server (monotonic)
    accepted_total: AtomicU64,
    /// Attempts answered but rejected / rate-limited (monotonic)
    rejected_total: AtomicU64,
    /// Attempts that never got an HTTP answer (monotonic)
    transport_errors_total: AtomicU64,
    /// Entry id of the last accepted report (gauge)
    last_entry_id: AtomicU64,
    /// Submit latency sum in microseconds (reset on report)
    submit_latency_sum_us: AtomicU64,
    /// Max submit latency in microseconds (reset on report)
    submit_latency_max_us: AtomicU64,
    /// Attempts since last report (reset on report)
    attempts_since_report: AtomicU64,
    /// Current free slots, zone A (gauge)
    free_a: AtomicU64,
    /// Current free slots, zone B (gauge)
    free_b: AtomicU64,
    /// Whether a change is awaiting a confirmed report (gauge, 0/1)
    pending_change: AtomicU64,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            samples_total: AtomicU64::new(0),
            changes_total: AtomicU64::new(0),
            attempts_total: AtomicU64::new(0),
            accepted_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            transport_errors_total: AtomicU64::new(0),
            last_entry_id: AtomicU64::new(0),
            submit_latency_sum_us: AtomicU64::new(0),
            submit_latency_max_us: AtomicU64::new(0),
            attempts_since_report: AtomicU64::new(0),
            free_a: AtomicU64::new(0),
            free_b: AtomicU64::new(0),
            pending_change: AtomicU64::new(0),
        }
    }

    pub fn record_sample(&self) {
        self.samples_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_change(&self) {
        self.changes_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one attempt reaching the transport, whatever the outcome
    pub fn record_attempt(&self, latency_us: u64) {
        self.attempts_total.fetch_add(1, Ordering::Relaxed);
        self.attempts_since_report.fetch_add(1, Ordering::Relaxed);
        self.submit_latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        update_atomic_max(&self.submit_latency_max_us, latency_us);
    }

    pub fn record_accepted(&self, entry_id: u64) {
        self.accepted_total.fetch_add(1, Ordering::Relaxed);
        self.last_entry_id.store(entry_id, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transport_error(&self) {
        self.transport_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn set_occupancy(&self, free_a: u8, free_b: u8) {
        self.free_a.store(free_a as u64, Ordering::Relaxed);
        self.free_b.store(free_b as u64, Ordering::Relaxed);
    }

    pub fn set_pending(&self, pending: bool) {
        self.pending_change.store(pending as u64, Ordering::Relaxed);
    }

    /// Snapshot for the periodic log line; interval latency stats are
    /// swapped out atomically so each report covers its own interval.
    pub fn report(&self) -> MetricsSummary {
        let attempts_interval = self.attempts_since_report.swap(0, Ordering::Relaxed);
        let latency_sum = self.submit_latency_sum_us.swap(0, Ordering::Relaxed);
        let latency_max = self.submit_latency_max_us.swap(0, Ordering::Relaxed);
        let latency_avg = if attempts_interval > 0 { latency_sum / attempts_interval } else { 0 };

        MetricsSummary {
            samples_total: self.samples_total.load(Ordering::Relaxed),
            changes_total: self.changes_total.load(Ordering::Relaxed),
            attempts_total: self.attempts_total.load(Ordering::Relaxed),
            accepted_total: self.accepted_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            transport_errors_total: self.transport_errors_total.load(Ordering::Relaxed),
            last_entry_id: self.last_entry_id.load(Ordering::Relaxed),
            attempts_interval,
            submit_latency_avg_us: latency_avg,
            submit_latency_max_us: latency_max,
            free_a: self.free_a.load(Ordering::Relaxed),
            free_b: self.free_b.load(Ordering::Relaxed),
            pending_change: self.pending_change.load(Ordering::Relaxed) != 0,
        }
    }

    /// Non-resetting view of the monotonic counters and gauges, used by
    /// the Prometheus endpoint so scrapes never disturb the log summary.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            samples_total: self.samples_total.load(Ordering::Relaxed),
            changes_total: self.changes_total.load(Ordering::Relaxed),
            attempts_total: self.attempts_total.load(Ordering::Relaxed),
            accepted_total: self.accepted_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            transport_errors_total: self.transport_errors_total.load(Ordering::Relaxed),
            last_entry_id: self.last_entry_id.load(Ordering::Relaxed),
            free_a: self.free_a.load(Ordering::Relaxed),
            free_b: self.free_b.load(Ordering::Relaxed),
            pending_change: self.pending_change.load(Ordering::Relaxed),
        }
    }
}

/// Periodic summary, logged by the metrics reporter task
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub samples_total: u64,
    pub changes_total: u64,
    pub attempts_total: u64,
    pub accepted_total: u64,
    pub rejected_total: u64,
    pub transport_errors_total: u64,
    pub last_entry_id: u64,
    pub attempts_interval: u64,
    pub submit_latency_avg_us: u64,
    pub submit_latency_max_us: u64,
    pub free_a: u64,
    pub free_b: u64,
    pub pending_change: bool,
}

impl MetricsSummary {
    pub fn log(&self) {
        info!(
            samples = self.samples_total,
            changes = self.changes_total,
            attempts = self.attempts_total,
            accepted = self.accepted_total,
            rejected = self.rejected_total,
            transport_errors = self.transport_errors_total,
            last_entry_id = self.last_entry_id,
            submit_avg_us = self.submit_latency_avg_us,
            submit_max_us = self.submit_latency_max_us,
            free_a = self.free_a,
            free_b = self.free_b,
            pending = self.pending_change,
            "metrics_summary"
        );
    }
}

/// Non-resetting counter/gauge view for the Prometheus endpoint
#[derive(Debug, Clone, Copy)]
pub struct MetricsSnapshot {
    pub samples_total: u64,
    pub changes_total: u64,
    pub attempts_total: u64,
    pub accepted_total: u64,
    pub rejected_total: u64,
    pub transport_errors_total: u64,
    pub last_entry_id: u64,
    pub free_a: u64,
    pub free_b: u64,
    pub pending_change: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_swaps_interval_stats() {
        let metrics = Metrics::new();
        metrics.record_attempt(100);
        metrics.record_attempt(300);

        let summary = metrics.report();
        assert_eq!(summary.attempts_total, 2);
        assert_eq!(summary.attempts_interval, 2);
        assert_eq!(summary.submit_latency_avg_us, 200);
        assert_eq!(summary.submit_latency_max_us, 300);

        // Next interval starts clean, totals persist
        let summary = metrics.report();
        assert_eq!(summary.attempts_total, 2);
        assert_eq!(summary.attempts_interval, 0);
        assert_eq!(summary.submit_latency_avg_us, 0);
        assert_eq!(summary.submit_latency_max_us, 0);
    }

    #[test]
    fn test_snapshot_does_not_reset() {
        let metrics = Metrics::new();
        metrics.record_attempt(500);
        metrics.record_accepted(17);
        metrics.set_occupancy(3, 4);
        metrics.set_pending(true);

        let snap = metrics.snapshot();
        assert_eq!(snap.attempts_total, 1);
        assert_eq!(snap.accepted_total, 1);
        assert_eq!(snap.last_entry_id, 17);
        assert_eq!(snap.free_a, 3);
        assert_eq!(snap.free_b, 4);
        assert_eq!(snap.pending_change, 1);

        // Snapshot must leave interval stats for the log summary
        let summary = metrics.report();
        assert_eq!(summary.attempts_interval, 1);
        assert_eq!(summary.submit_latency_max_us, 500);
    }

    #[test]
    fn test_outcome_counters_are_independent() {
        let metrics = Metrics::new();
        metrics.record_accepted(5);
        metrics.record_rejected();
        metrics.record_rejected();
        metrics.record_transport_error();

        let snap = metrics.snapshot();
        assert_eq!(snap.accepted_total, 1);
        assert_eq!(snap.rejected_total, 2);
        assert_eq!(snap.transport_errors_total, 1);
    }
}
