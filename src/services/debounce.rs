//! Change detection against the previous sample
//!
//! The debouncer owns the previous sample outright - it runs only on the
//! display path, which is the single sampling authority. Detecting a
//! difference arms (or re-arms) the settle timer through the shared cell;
//! the flag is never cleared here, only by a confirmed report.

use crate::domain::types::SensorSample;
use crate::services::report_gate::ReportShared;
use std::sync::Arc;
use tokio::time::Instant;

pub struct ChangeDebouncer {
    previous: SensorSample,
    shared: Arc<ReportShared>,
}

impl ChangeDebouncer {
    /// `initial` primes the comparison baseline so the first tick after
    /// boot does not report a phantom change.
    pub fn new(initial: SensorSample, shared: Arc<ReportShared>) -> Self {
        Self { previous: initial, shared }
    }

    /// Compare `sample` against the previous one. On any differing
    /// sensor: adopt the new sample as the baseline and arm the settle
    /// timer at `now`. Returns whether a change was detected.
    pub fn observe(&mut self, sample: &SensorSample, now: Instant) -> bool {
        if !sample.differs_from(&self.previous) {
            return false;
        }

        self.previous = *sample;
        self.shared.mark_change(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{SensorLevel, SENSOR_COUNT};
    use crate::services::report_gate::GateDecision;
    use std::time::Duration;

    fn sample_at(base: Instant, offset_ms: u64) -> SensorSample {
        SensorSample::new(
            [SensorLevel::Clear; SENSOR_COUNT],
            base + Duration::from_millis(offset_ms),
        )
    }

    #[test]
    fn test_identical_sample_is_not_a_change() {
        let base = Instant::now();
        let shared = Arc::new(ReportShared::new());
        let mut debouncer = ChangeDebouncer::new(sample_at(base, 0), shared.clone());

        assert!(!debouncer.observe(&sample_at(base, 200), base));
        assert!(!shared.pending());
    }

    #[test]
    fn test_flip_sets_pending_and_arms_settle_timer() {
        let base = Instant::now();
        let shared = Arc::new(ReportShared::new());
        let mut debouncer = ChangeDebouncer::new(sample_at(base, 0), shared.clone());

        let mut changed = sample_at(base, 500);
        changed.levels[3] = SensorLevel::Blocked;

        assert!(debouncer.observe(&changed, changed.captured_at));
        assert!(shared.pending());
        // Settle timer runs from the change, not from boot
        assert_eq!(
            shared.evaluate(base + Duration::from_millis(2400)),
            GateDecision::Settling
        );
        assert_eq!(
            shared.evaluate(base + Duration::from_millis(2501)),
            GateDecision::Admit
        );
    }

    #[test]
    fn test_second_call_with_same_levels_does_not_rearm() {
        let base = Instant::now();
        let shared = Arc::new(ReportShared::new());
        let mut debouncer = ChangeDebouncer::new(sample_at(base, 0), shared.clone());

        let mut changed = sample_at(base, 500);
        changed.levels[0] = SensorLevel::Blocked;

        assert!(debouncer.observe(&changed, changed.captured_at));
        // Same physical state, later tick: baseline already adopted
        let mut repeat = sample_at(base, 700);
        repeat.levels[0] = SensorLevel::Blocked;
        assert!(!debouncer.observe(&repeat, repeat.captured_at));

        // Settle timer still anchored at the 500 ms change
        assert_eq!(
            shared.evaluate(base + Duration::from_millis(2501)),
            GateDecision::Admit
        );
    }

    #[test]
    fn test_flip_back_counts_as_another_change() {
        let base = Instant::now();
        let shared = Arc::new(ReportShared::new());
        let mut debouncer = ChangeDebouncer::new(sample_at(base, 0), shared.clone());

        let mut blocked = sample_at(base, 0);
        blocked.levels[2] = SensorLevel::Blocked;
        assert!(debouncer.observe(&blocked, base));

        let cleared = sample_at(base, 1000);
        assert!(debouncer.observe(&cleared, cleared.captured_at));

        // Settle restarted by the second transition
        assert_eq!(
            shared.evaluate(base + Duration::from_millis(2500)),
            GateDecision::Settling
        );
        assert_eq!(
            shared.evaluate(base + Duration::from_millis(3001)),
            GateDecision::Admit
        );
    }
}
