//! Beam sensor bank access
//!
//! The IR sensors are plain digital inputs: the beam idles high (clear)
//! and goes low when a vehicle interrupts it. On the gateway they are
//! exposed through sysfs GPIO; the sim binary and the tests use the
//! in-memory implementation instead.

use crate::domain::types::{SensorLevel, SensorSample, SENSOR_COUNT};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, warn};

/// Read access to the fixed sensor bank.
///
/// `read` returns the current level of one sensor; `sample` captures all
/// of them at one instant. Implementations must be cheap enough to call
/// every display tick.
pub trait SensorArray: Send + Sync {
    fn read(&self, index: usize) -> SensorLevel;

    fn sample(&self) -> SensorSample {
        let mut levels = [SensorLevel::Clear; SENSOR_COUNT];
        for (i, level) in levels.iter_mut().enumerate() {
            *level = self.read(i);
        }
        SensorSample::new(levels, Instant::now())
    }
}

/// Sensor bank wired to Linux sysfs GPIO value files.
///
/// Pins are exported and configured as inputs by the provisioning script;
/// this reader only ever opens `/sys/class/gpio/gpioN/value`.
pub struct GpioSensorArray {
    value_paths: Vec<PathBuf>,
    /// Last successfully read level per sensor. A failed read repeats the
    /// last known level instead of inventing a transition - a flaky pin
    /// must not look like a parking event.
    last_known: Mutex<[SensorLevel; SENSOR_COUNT]>,
}

impl GpioSensorArray {
    pub fn new(pins: &[u32]) -> Self {
        assert_eq!(pins.len(), SENSOR_COUNT, "one GPIO pin per sensor");

        let value_paths = pins
            .iter()
            .map(|pin| PathBuf::from(format!("/sys/class/gpio/gpio{}/value", pin)))
            .collect();

        info!(pins = ?pins, "gpio_sensor_array_initialized");
        Self { value_paths, last_known: Mutex::new([SensorLevel::Clear; SENSOR_COUNT]) }
    }
}

impl SensorArray for GpioSensorArray {
    fn read(&self, index: usize) -> SensorLevel {
        match std::fs::read_to_string(&self.value_paths[index]) {
            Ok(raw) => {
                // Sysfs reports "0\n" or "1\n"; high = beam clear
                let level = if raw.trim_start().starts_with('0') {
                    SensorLevel::Blocked
                } else {
                    SensorLevel::Clear
                };
                self.last_known.lock()[index] = level;
                level
            }
            Err(e) => {
                let level = self.last_known.lock()[index];
                warn!(
                    sensor = index,
                    error = %e,
                    held = level.as_str(),
                    "gpio_read_failed"
                );
                level
            }
        }
    }
}

/// In-memory sensor bank for the sim binary and tests.
///
/// Clones share the underlying levels, so a scenario driver can keep one
/// handle and flip slots while the display loop polls another.
#[derive(Clone)]
pub struct SimulatedSensorArray {
    levels: Arc<Mutex<[SensorLevel; SENSOR_COUNT]>>,
}

impl SimulatedSensorArray {
    pub fn new() -> Self {
        Self { levels: Arc::new(Mutex::new([SensorLevel::Clear; SENSOR_COUNT])) }
    }

    pub fn set(&self, index: usize, level: SensorLevel) {
        self.levels.lock()[index] = level;
    }

    pub fn set_all(&self, levels: [SensorLevel; SENSOR_COUNT]) {
        *self.levels.lock() = levels;
    }
}

impl Default for SimulatedSensorArray {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorArray for SimulatedSensorArray {
    fn read(&self, index: usize) -> SensorLevel {
        self.levels.lock()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simulated_array_starts_clear() {
        let bank = SimulatedSensorArray::new();
        let sample = bank.sample();
        assert!(sample.levels.iter().all(|&l| l == SensorLevel::Clear));
    }

    #[test]
    fn test_simulated_array_shares_state_across_clones() {
        let bank = SimulatedSensorArray::new();
        let handle = bank.clone();

        handle.set(5, SensorLevel::Blocked);
        assert_eq!(bank.read(5), SensorLevel::Blocked);
        assert_eq!(bank.read(4), SensorLevel::Clear);
    }

    #[test]
    fn test_sample_reads_every_sensor() {
        let bank = SimulatedSensorArray::new();
        bank.set(0, SensorLevel::Blocked);
        bank.set(7, SensorLevel::Blocked);

        let sample = bank.sample();
        assert_eq!(sample.levels[0], SensorLevel::Blocked);
        assert_eq!(sample.levels[7], SensorLevel::Blocked);
        assert_eq!(sample.levels[3], SensorLevel::Clear);
    }

    #[test]
    fn test_gpio_read_failure_holds_last_known() {
        // Paths that cannot exist; every read fails and holds the default
        let bank = GpioSensorArray::new(&[9001, 9002, 9003, 9004, 9005, 9006, 9007, 9008]);
        assert_eq!(bank.read(0), SensorLevel::Clear);

        // Seed a different last-known level and confirm it is held
        bank.last_known.lock()[0] = SensorLevel::Blocked;
        assert_eq!(bank.read(0), SensorLevel::Blocked);
    }
}
