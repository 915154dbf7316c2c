//! Simulated sensors
//!
//! Produces plausible telemetry without hardware. Calm mode drifts like a
//! pedestrian; intense mode swings like someone in free fall.

use super::hub::SensorHub;
use super::readings::{LocationReading, MotionReading, TelemetrySnapshot, Vector3, MPS_TO_MPH};
use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const BASE_LATITUDE: f64 = 37.7749;
const BASE_LONGITUDE: f64 = -122.4194;
const BASE_ALTITUDE: f64 = 142.3;
const SEA_LEVEL_KPA: f64 = 101.325;
/// Calm ticks per counted step
const STEP_TICKS: u64 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SimulationMode {
    #[default]
    Calm,
    Intense,
}

impl SimulationMode {
    pub fn update_interval(&self) -> Duration {
        match self {
            SimulationMode::Calm => Duration::from_millis(100),
            SimulationMode::Intense => Duration::from_millis(50),
        }
    }
}

/// Telemetry at time `t` (seconds) for the given mode
pub fn sample(t: f64, mode: SimulationMode, step_count: u64) -> TelemetrySnapshot {
    let intense = mode == SimulationMode::Intense;

    let alt_variation = if intense {
        (t * 2.0).sin() * 50.0
    } else {
        (t * 0.5).sin() * 2.0
    };
    let relative_altitude = if intense { (t * 1.5).sin() * 30.0 } else { 0.0 };
    let speed_mph = if intense {
        ((t * 1.5).sin() * 55.0).abs()
    } else {
        ((t * 0.3).sin() * 5.0).abs()
    };
    let heading = (t * 30.0).rem_euclid(360.0);

    let location = LocationReading {
        latitude: BASE_LATITUDE + (t * 0.1).sin() * 0.001,
        longitude: BASE_LONGITUDE + (t * 0.1).cos() * 0.001,
        altitude: BASE_ALTITUDE + alt_variation,
        speed: speed_mph / MPS_TO_MPH,
        course: heading,
        heading,
    };

    let motion = if intense {
        MotionReading {
            roll: (t * 3.0).sin() * 180.0,
            pitch: (t * 2.5).cos() * 90.0,
            yaw: (t * 2.0).sin() * 180.0,
            user_acceleration: Vector3::new(
                (t * 4.0).sin() * 3.0,
                (t * 3.5).cos() * 3.0,
                (t * 3.0).sin() * 5.0,
            ),
            rotation_rate: Vector3::new(
                (t * 5.0).sin() * 360.0,
                (t * 4.5).cos() * 360.0,
                (t * 4.0).sin() * 360.0,
            ),
            magnetic_field: Vector3::new(22.0, 5.0, -42.0),
            pressure: SEA_LEVEL_KPA - alt_variation * 0.012,
            relative_altitude,
            step_count,
        }
    } else {
        MotionReading {
            roll: (t * 0.5).sin() * 30.0,
            pitch: (t * 0.3).cos() * 15.0,
            yaw: (t * 0.4).sin() * 45.0,
            user_acceleration: Vector3::new(t.sin() * 0.1, (t * 0.8).cos() * 0.1, 1.0),
            rotation_rate: Vector3::new(
                (t * 0.5).sin() * 10.0,
                (t * 0.6).cos() * 10.0,
                (t * 0.4).sin() * 10.0,
            ),
            magnetic_field: Vector3::new(22.0, 5.0, -42.0),
            pressure: SEA_LEVEL_KPA - alt_variation * 0.012,
            relative_altitude,
            step_count,
        }
    };

    TelemetrySnapshot {
        captured_at: Utc::now(),
        location,
        motion,
    }
}

/// Publishes simulated telemetry into a [`SensorHub`] until stopped
pub struct SimulatedSensors {
    mode: Arc<RwLock<SimulationMode>>,
    task: JoinHandle<()>,
}

impl SimulatedSensors {
    /// Start publishing; must be called inside a tokio runtime
    pub fn start(hub: SensorHub, mode: SimulationMode) -> Self {
        let mode = Arc::new(RwLock::new(mode));
        let task = tokio::spawn(run(hub, mode.clone()));
        tracing::debug!("Simulated sensors started");
        Self { mode, task }
    }

    pub fn mode(&self) -> SimulationMode {
        *self.mode.read()
    }

    /// Switch modes; the update rate follows on the next tick
    pub fn set_mode(&self, mode: SimulationMode) {
        *self.mode.write() = mode;
    }

    pub fn stop(self) {
        self.task.abort();
        tracing::debug!("Simulated sensors stopped");
    }
}

impl Drop for SimulatedSensors {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run(hub: SensorHub, mode: Arc<RwLock<SimulationMode>>) {
    let mut ticks: u64 = 0;
    let mut steps: u64 = 0;
    loop {
        let current = *mode.read();
        if current == SimulationMode::Calm {
            ticks += 1;
            if ticks % STEP_TICKS == 0 {
                steps += 1;
            }
        }

        let now = Utc::now();
        let t = now.timestamp_millis() as f64 / 1000.0;
        let mut snapshot = sample(t, current, steps);
        snapshot.captured_at = now;
        hub.publish(snapshot);

        tokio::time::sleep(current.update_interval()).await;
    }
}
