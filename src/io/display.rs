//! Occupancy display rendering
//!
//! The display is fire-and-forget: it consumes zone counts and never
//! reports failure back into the loops. The console panel reproduces the
//! two-line layout of the 16x2 character LCD on the lot controller.

use crate::domain::types::ZoneCounts;
use tracing::{info, trace};

/// Output seam for the occupancy summary.
pub trait StatusDisplay: Send {
    fn render(&mut self, counts: &ZoneCounts);
}

/// Console-backed panel. Logs the two LCD lines at info level when the
/// counts change and at trace level on routine refreshes, so a 200 ms
/// cadence does not flood the journal.
pub struct ConsolePanel {
    last: Option<ZoneCounts>,
}

impl ConsolePanel {
    pub fn new() -> Self {
        Self { last: None }
    }

    fn lines(counts: &ZoneCounts) -> (String, String) {
        (
            format!("Lot A: {} free", counts.free_a),
            format!("Lot B: {} free", counts.free_b),
        )
    }
}

impl Default for ConsolePanel {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusDisplay for ConsolePanel {
    fn render(&mut self, counts: &ZoneCounts) {
        let (line_a, line_b) = Self::lines(counts);
        if self.last != Some(*counts) {
            info!(line_a = %line_a, line_b = %line_b, "panel_updated");
            self.last = Some(*counts);
        } else {
            trace!(line_a = %line_a, line_b = %line_b, "panel_refresh");
        }
    }
}

/// Display sink for headless deployments (display.enabled = false).
pub struct NullPanel;

impl StatusDisplay for NullPanel {
    fn render(&mut self, _counts: &ZoneCounts) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lines_match_lcd_layout() {
        let counts = ZoneCounts { free_a: 3, free_b: 1 };
        let (line_a, line_b) = ConsolePanel::lines(&counts);
        assert_eq!(line_a, "Lot A: 3 free");
        assert_eq!(line_b, "Lot B: 1 free");
    }

    #[test]
    fn test_panel_tracks_last_counts() {
        let mut panel = ConsolePanel::new();
        let counts = ZoneCounts { free_a: 4, free_b: 4 };

        panel.render(&counts);
        assert_eq!(panel.last, Some(counts));

        let changed = ZoneCounts { free_a: 3, free_b: 4 };
        panel.render(&changed);
        assert_eq!(panel.last, Some(changed));
    }
}
