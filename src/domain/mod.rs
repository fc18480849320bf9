//! Domain models - core value types of the lot monitor
//!
//! This module contains the canonical data types used throughout the system:
//! - `SensorLevel` / `SensorSample` - one beam reading, and all 8 at an instant
//! - `ZoneCounts` - free slots per zone, derived for display
//! - `TelemetryFields` - the occupied-high wire payload
//! - `SubmitOutcome` - raw result of one telemetry submission

pub mod types;

pub use types::{
    SensorLevel, SensorSample, SubmitOutcome, TelemetryFields, ZoneCounts, SENSOR_COUNT,
    ZONE_SPLIT,
};
