//! Telemetry report attempts and outcome reconciliation
//!
//! On admission by the gate, the reporter maps the latest published
//! sample to the occupied-high wire fields, performs one submission, and
//! reconciles the outcome into the shared cell: every attempt moves the
//! cooldown window, but only a confirmed acceptance clears the pending
//! flag. Failures are absorbed here - nothing escalates past this module.

use crate::domain::types::{SensorSample, TelemetryFields};
use crate::infra::metrics::Metrics;
use crate::io::thingspeak::TelemetryTransport;
use crate::services::report_gate::ReportShared;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// How one attempt ended, for loop-side logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Server stored the update under this entry id; pending cleared.
    Accepted(i64),
    /// Server answered but did not store (rate limit / bad data);
    /// pending stays set for the next eligible tick.
    Rejected,
    /// No usable HTTP answer; pending stays set.
    TransportError,
}

pub struct TelemetryReporter {
    transport: Arc<dyn TelemetryTransport>,
    shared: Arc<ReportShared>,
    metrics: Arc<Metrics>,
}

impl TelemetryReporter {
    pub fn new(
        transport: Arc<dyn TelemetryTransport>,
        shared: Arc<ReportShared>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { transport, shared, metrics }
    }

    /// Perform one report attempt with the given sample.
    pub async fn attempt(&self, sample: &SensorSample) -> ReportOutcome {
        let fields = TelemetryFields::from_sample(sample);
        let start = Instant::now();

        let result = self.transport.submit(&fields).await;

        // The cooldown runs from the end of the attempt, whatever happened
        self.shared.record_attempt(Instant::now());
        let latency_us = start.elapsed().as_micros() as u64;
        self.metrics.record_attempt(latency_us);

        match result {
            Ok(outcome) => {
                let entry_id = outcome.entry_id();
                info!(
                    fields = %fields,
                    status = outcome.http_status,
                    entry_id = entry_id,
                    latency_us = latency_us,
                    "telemetry_report"
                );

                if outcome.is_accepted() {
                    self.shared.clear_pending();
                    self.metrics.record_accepted(entry_id as u64);
                    ReportOutcome::Accepted(entry_id)
                } else {
                    warn!(
                        status = outcome.http_status,
                        entry_id = entry_id,
                        "telemetry_report_rejected"
                    );
                    self.metrics.record_rejected();
                    ReportOutcome::Rejected
                }
            }
            Err(e) => {
                warn!(error = %e, latency_us = latency_us, "telemetry_submit_failed");
                self.metrics.record_transport_error();
                ReportOutcome::TransportError
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{SensorLevel, SubmitOutcome, SENSOR_COUNT};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;

    /// Transport answering from a script, recording submitted fields.
    struct ScriptedTransport {
        responses: Mutex<VecDeque<anyhow::Result<SubmitOutcome>>>,
        submitted: Mutex<Vec<TelemetryFields>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<anyhow::Result<SubmitOutcome>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                submitted: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TelemetryTransport for ScriptedTransport {
        async fn submit(&self, fields: &TelemetryFields) -> anyhow::Result<SubmitOutcome> {
            self.submitted.lock().push(*fields);
            self.responses.lock().pop_front().expect("script exhausted")
        }
    }

    fn ok(status: u16, body: &str) -> anyhow::Result<SubmitOutcome> {
        Ok(SubmitOutcome { http_status: status, body: body.to_string() })
    }

    fn reporter_with(
        responses: Vec<anyhow::Result<SubmitOutcome>>,
    ) -> (TelemetryReporter, Arc<ScriptedTransport>, Arc<ReportShared>, Arc<Metrics>) {
        let transport = Arc::new(ScriptedTransport::new(responses));
        let shared = Arc::new(ReportShared::new());
        let metrics = Arc::new(Metrics::new());
        let reporter =
            TelemetryReporter::new(transport.clone(), shared.clone(), metrics.clone());
        (reporter, transport, shared, metrics)
    }

    fn sample_with_slot_3_occupied() -> SensorSample {
        let mut levels = [SensorLevel::Clear; SENSOR_COUNT];
        levels[3] = SensorLevel::Blocked;
        SensorSample::new(levels, Instant::now())
    }

    #[tokio::test]
    async fn test_accepted_report_clears_pending() {
        let (reporter, transport, shared, metrics) = reporter_with(vec![ok(200, "17")]);
        shared.mark_change(Instant::now());

        let outcome = reporter.attempt(&sample_with_slot_3_occupied()).await;

        assert_eq!(outcome, ReportOutcome::Accepted(17));
        assert!(!shared.pending());
        assert!(shared.last_send_at().is_some());
        assert_eq!(metrics.snapshot().accepted_total, 1);
        assert_eq!(metrics.snapshot().last_entry_id, 17);

        // Payload carried the occupied-high polarity
        assert_eq!(transport.submitted.lock()[0].0, [0, 0, 0, 1, 0, 0, 0, 0]);
    }

    #[tokio::test]
    async fn test_rejected_report_keeps_pending_and_records_attempt() {
        let (reporter, _transport, shared, metrics) = reporter_with(vec![ok(200, "0")]);
        shared.mark_change(Instant::now());

        let outcome = reporter.attempt(&sample_with_slot_3_occupied()).await;

        assert_eq!(outcome, ReportOutcome::Rejected);
        assert!(shared.pending());
        // The cooldown window still moved
        assert!(shared.last_send_at().is_some());
        assert_eq!(metrics.snapshot().rejected_total, 1);
        assert_eq!(metrics.snapshot().accepted_total, 0);
    }

    #[tokio::test]
    async fn test_non_200_with_entry_id_is_rejected() {
        let (reporter, _transport, shared, _metrics) = reporter_with(vec![ok(429, "17")]);
        shared.mark_change(Instant::now());

        let outcome = reporter.attempt(&sample_with_slot_3_occupied()).await;
        assert_eq!(outcome, ReportOutcome::Rejected);
        assert!(shared.pending());
    }

    #[tokio::test]
    async fn test_transport_error_keeps_pending_and_records_attempt() {
        let (reporter, _transport, shared, metrics) =
            reporter_with(vec![Err(anyhow::anyhow!("connection refused"))]);
        shared.mark_change(Instant::now());

        let outcome = reporter.attempt(&sample_with_slot_3_occupied()).await;

        assert_eq!(outcome, ReportOutcome::TransportError);
        assert!(shared.pending());
        assert!(shared.last_send_at().is_some());
        assert_eq!(metrics.snapshot().transport_errors_total, 1);
    }

    #[tokio::test]
    async fn test_retry_after_rejection_resubmits_fresh_fields() {
        let (reporter, transport, shared, _metrics) =
            reporter_with(vec![ok(200, "0"), ok(200, "18")]);
        shared.mark_change(Instant::now());

        assert_eq!(
            reporter.attempt(&sample_with_slot_3_occupied()).await,
            ReportOutcome::Rejected
        );

        // The lot changed between attempts; the retry reflects it
        let mut levels = [SensorLevel::Clear; SENSOR_COUNT];
        levels[3] = SensorLevel::Blocked;
        levels[6] = SensorLevel::Blocked;
        let fresh = SensorSample::new(levels, Instant::now());

        assert_eq!(reporter.attempt(&fresh).await, ReportOutcome::Accepted(18));
        assert!(!shared.pending());

        let submitted = transport.submitted.lock();
        assert_eq!(submitted[0].0, [0, 0, 0, 1, 0, 0, 0, 0]);
        assert_eq!(submitted[1].0, [0, 0, 0, 1, 0, 0, 1, 0]);
    }

    #[tokio::test]
    async fn test_unparseable_body_lands_on_rejected_path() {
        let (reporter, _transport, shared, metrics) =
            reporter_with(vec![ok(200, "<html>rate limited</html>")]);
        shared.mark_change(Instant::now());

        let outcome = reporter.attempt(&sample_with_slot_3_occupied()).await;
        assert_eq!(outcome, ReportOutcome::Rejected);
        assert!(shared.pending());
        assert_eq!(metrics.snapshot().rejected_total, 1);
    }
}
