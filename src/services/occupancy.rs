//! Zone occupancy aggregation for the display
//!
//! Purely derived from one sample and recomputed every display tick;
//! never shared with the reporting path. A clear beam is a free slot.

use crate::domain::types::{SensorLevel, SensorSample, ZoneCounts, ZONE_SPLIT};

/// Count free slots per zone: sensors below `ZONE_SPLIT` belong to
/// zone A, the rest to zone B. Always totals over all sensors.
pub fn zone_counts(sample: &SensorSample) -> ZoneCounts {
    let mut counts = ZoneCounts { free_a: 0, free_b: 0 };
    for (i, level) in sample.levels.iter().enumerate() {
        if *level == SensorLevel::Clear {
            if i < ZONE_SPLIT {
                counts.free_a += 1;
            } else {
                counts.free_b += 1;
            }
        }
    }
    counts
}
