//! Sensor telemetry
//!
//! Location and motion readings, the overlay label formatter, a latest-value
//! hub for sharing readings across tasks, and a simulated sensor source.

pub mod format;
pub mod hub;
pub mod readings;
pub mod simulated;

pub use format::{format_lines, heading_to_direction};
pub use hub::SensorHub;
pub use readings::{LocationReading, MotionReading, TelemetrySnapshot, Vector3};
pub use simulated::{SimulatedSensors, SimulationMode};
