//! Sensor reading types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Meters per second to miles per hour
pub const MPS_TO_MPH: f64 = 2.23694;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A GPS fix plus compass heading
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationReading {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters above sea level
    pub altitude: f64,
    /// Meters per second; negative when the receiver has no valid speed
    pub speed: f64,
    /// Direction of travel in degrees
    pub course: f64,
    /// Compass heading in degrees
    pub heading: f64,
}

impl LocationReading {
    pub fn speed_mph(&self) -> f64 {
        self.speed * MPS_TO_MPH
    }
}

/// Device motion and environment sensors
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MotionReading {
    /// Attitude in degrees
    pub roll: f64,
    pub pitch: f64,
    pub yaw: f64,
    /// User acceleration in g, gravity removed
    pub user_acceleration: Vector3,
    /// Degrees per second
    pub rotation_rate: Vector3,
    /// Microtesla
    pub magnetic_field: Vector3,
    /// Barometric pressure in kPa
    pub pressure: f64,
    /// Meters relative to where tracking started
    pub relative_altitude: f64,
    pub step_count: u64,
}

/// Everything the overlay shows at one instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetrySnapshot {
    pub captured_at: DateTime<Utc>,
    pub location: LocationReading,
    pub motion: MotionReading,
}

impl Default for TelemetrySnapshot {
    fn default() -> Self {
        Self {
            captured_at: Utc::now(),
            location: LocationReading::default(),
            motion: MotionReading::default(),
        }
    }
}
