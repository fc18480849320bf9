//! Report admission gate and the shared state behind it
//!
//! The display loop and the report loop coordinate through exactly three
//! fields: the pending-change flag, the time of the last detected change,
//! and the time of the last report attempt. `ReportShared` keeps them
//! behind one short-critical-section mutex with a single-writer rule per
//! field: the display path sets `pending_change` and `last_change_at`,
//! the reporter writes `last_send_at` and is the only place allowed to
//! clear `pending_change`. The mutex is the happens-before edge between
//! the two tasks.
//!
//! Gate policy per report tick, all guards strict:
//! 1. a change is pending
//! 2. no new change for SETTLE_WINDOW (the physical state has settled)
//! 3. at least COOLDOWN_WINDOW since the previous attempt
//! Guards 1+2 passing while 3 fails is a silent no-op; the pending flag
//! survives and the next tick re-evaluates.

use parking_lot::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Stability required after a detected change before it is reportable.
pub const SETTLE_WINDOW: Duration = Duration::from_millis(2000);

/// Minimum spacing between two consecutive report attempts.
pub const COOLDOWN_WINDOW: Duration = Duration::from_millis(3000);

/// Outcome of one gate evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Nothing pending; nothing to do.
    Idle,
    /// A change is pending but the settle window has not elapsed.
    Settling,
    /// Settled, but the previous attempt is too recent.
    Cooldown,
    /// All guards passed; attempt a report now.
    Admit,
}

impl GateDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            GateDecision::Idle => "idle",
            GateDecision::Settling => "settling",
            GateDecision::Cooldown => "cooldown",
            GateDecision::Admit => "admit",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ReportState {
    pending_change: bool,
    last_change_at: Option<Instant>,
    last_send_at: Option<Instant>,
}

/// The three fields shared between the display and report loops.
///
/// `None` timestamps mean "never": a fresh process admits its first
/// settled change without waiting out a cooldown.
pub struct ReportShared {
    state: Mutex<ReportState>,
}

impl ReportShared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ReportState {
                pending_change: false,
                last_change_at: None,
                last_send_at: None,
            }),
        }
    }

    /// Display path: a debounced change was observed at `now`. Re-arms
    /// the settle timer even when a change was already pending.
    pub fn mark_change(&self, now: Instant) {
        let mut state = self.state.lock();
        state.pending_change = true;
        state.last_change_at = Some(now);
    }

    /// Reporter: every attempt moves the cooldown window, success or not.
    pub fn record_attempt(&self, now: Instant) {
        self.state.lock().last_send_at = Some(now);
    }

    /// Reporter: the server confirmed the report; the pending flag is
    /// cleared here and nowhere else.
    pub fn clear_pending(&self) {
        self.state.lock().pending_change = false;
    }

    pub fn pending(&self) -> bool {
        self.state.lock().pending_change
    }

    /// Evaluate the gate at `now`. Read-only; admission does not consume
    /// the pending flag - only a confirmed report does.
    pub fn evaluate(&self, now: Instant) -> GateDecision {
        let state = *self.state.lock();

        if !state.pending_change {
            return GateDecision::Idle;
        }

        match state.last_change_at {
            Some(changed_at) if now.duration_since(changed_at) > SETTLE_WINDOW => {}
            _ => return GateDecision::Settling,
        }

        match state.last_send_at {
            None => GateDecision::Admit,
            Some(sent_at) if now.duration_since(sent_at) > COOLDOWN_WINDOW => GateDecision::Admit,
            Some(_) => GateDecision::Cooldown,
        }
    }

    #[cfg(test)]
    pub fn last_send_at(&self) -> Option<Instant> {
        self.state.lock().last_send_at
    }
}

impl Default for ReportShared {
    fn default() -> Self {
        Self::new()
    }
}
