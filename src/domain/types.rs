//! Shared types for the lot monitor

// tokio's Instant rather than std's: the loop tests drive the settle and
// cooldown windows on the paused test clock.
use tokio::time::Instant;

/// Number of beam sensors in the lot, one per slot. Fixed at build time;
/// the sensor bank, the wire payload, and the display all assume this width.
pub const SENSOR_COUNT: usize = 8;

/// First sensor index belonging to zone B. Zone A is everything below.
pub const ZONE_SPLIT: usize = SENSOR_COUNT / 2;

/// Level reported by one IR beam sensor.
///
/// The beam idles high: `Clear` means nothing interrupts it (slot free),
/// `Blocked` means a vehicle is breaking the beam (slot occupied).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorLevel {
    Clear,
    Blocked,
}

impl SensorLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorLevel::Clear => "clear",
            SensorLevel::Blocked => "blocked",
        }
    }
}

/// All sensor levels captured at a single instant.
///
/// Recreated on every polling tick; the display loop is the only producer
/// and publishes each sample through a watch channel for the report path.
#[derive(Debug, Clone, Copy)]
pub struct SensorSample {
    pub levels: [SensorLevel; SENSOR_COUNT],
    pub captured_at: Instant,
}

impl SensorSample {
    pub fn new(levels: [SensorLevel; SENSOR_COUNT], captured_at: Instant) -> Self {
        Self { levels, captured_at }
    }

    /// True if any sensor reads differently from `other`.
    pub fn differs_from(&self, other: &SensorSample) -> bool {
        self.levels != other.levels
    }
}

impl std::fmt::Display for SensorSample {
    /// Compact per-slot view, zone A then zone B: `CCBC|CCCC`.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, level) in self.levels.iter().enumerate() {
            if i == ZONE_SPLIT {
                write!(f, "|")?;
            }
            match level {
                SensorLevel::Clear => write!(f, "C")?,
                SensorLevel::Blocked => write!(f, "B")?,
            }
        }
        Ok(())
    }
}

/// Free-slot counts per zone, derived from one sample for display only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneCounts {
    pub free_a: u8,
    pub free_b: u8,
}

/// Wire payload for one report attempt: `1` = occupied, `0` = free.
///
/// The polarity is inverted relative to the display convention (`Clear`
/// counts as a free slot). The two mappings are defined independently and
/// stay separate; the server side expects occupied-high fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryFields(pub [u8; SENSOR_COUNT]);

impl TelemetryFields {
    pub fn from_sample(sample: &SensorSample) -> Self {
        let mut fields = [0u8; SENSOR_COUNT];
        for (field, level) in fields.iter_mut().zip(sample.levels.iter()) {
            *field = match level {
                SensorLevel::Blocked => 1,
                SensorLevel::Clear => 0,
            };
        }
        Self(fields)
    }
}

impl std::fmt::Display for TelemetryFields {
    /// Diagnostic form used by the report log line: `S1:0 S2:1 ...`
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, val) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "S{}:{}", i + 1, val)?;
        }
        Ok(())
    }
}

/// Raw result of one telemetry submission.
///
/// The endpoint answers a plain-text entry id; `0` (or anything that does
/// not parse as a positive integer) signals a rejected or rate-limited
/// update. No exception crosses this boundary - outcomes are values.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub http_status: u16,
    pub body: String,
}

impl SubmitOutcome {
    /// Server entry id parsed from the response body; unparseable bodies
    /// count as 0 and land on the rejected path.
    pub fn entry_id(&self) -> i64 {
        self.body.trim().parse::<i64>().unwrap_or(0)
    }

    /// A report is confirmed only when the HTTP layer and the entry id
    /// both agree; either alone is not enough to clear the pending flag.
    pub fn is_accepted(&self) -> bool {
        self.http_status == 200 && self.entry_id() > 0
    }
}
