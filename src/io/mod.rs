//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `sensors` - beam sensor bank access (sysfs GPIO + simulated)
//! - `display` - occupancy panel rendering
//! - `thingspeak` - HTTP telemetry transport
//! - `prometheus` - Prometheus metrics HTTP endpoint

pub mod display;
pub mod prometheus;
pub mod sensors;
pub mod thingspeak;

// Re-export commonly used types
pub use display::{ConsolePanel, NullPanel, StatusDisplay};
pub use sensors::{GpioSensorArray, SensorArray, SimulatedSensorArray};
pub use thingspeak::{TelemetryTransport, ThingSpeakClient};
