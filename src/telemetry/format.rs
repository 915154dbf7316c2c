//! Overlay label formatting

use super::readings::TelemetrySnapshot;

const DIRECTIONS: [&str; 8] = ["N", "NE", "E", "SE", "S", "SW", "W", "NW"];

/// 8-point compass direction for a heading in degrees
pub fn heading_to_direction(heading: f64) -> &'static str {
    let index = ((heading + 22.5) / 45.0).floor().rem_euclid(8.0) as usize;
    DIRECTIONS[index.min(7)]
}

/// Overlay labels, one per line, top to bottom
pub fn format_lines(snapshot: &TelemetrySnapshot) -> Vec<String> {
    let location = &snapshot.location;
    let motion = &snapshot.motion;
    let accel = motion.user_acceleration;
    let rotation = motion.rotation_rate;

    vec![
        format!("GPS: {:.6}°, {:.6}°", location.latitude, location.longitude),
        format!(
            "ALT: {:.1}m (GPS) | {:.1}m (Rel)",
            location.altitude, motion.relative_altitude
        ),
        format!("SPEED: {:.1} MPH", location.speed_mph().max(0.0)),
        format!(
            "HEADING: {:.1}° {}",
            location.heading,
            heading_to_direction(location.heading)
        ),
        format!(
            "ORIENT: R:{:.1}° P:{:.1}° Y:{:.1}°",
            motion.roll, motion.pitch, motion.yaw
        ),
        format!("ACCEL: X:{:.2} Y:{:.2} Z:{:.2} g", accel.x, accel.y, accel.z),
        format!(
            "ROTATION: X:{:.1} Y:{:.1} Z:{:.1} °/s",
            rotation.x, rotation.y, rotation.z
        ),
        format!("PRESSURE: {:.2} kPa", motion.pressure),
        format!("STEPS: {}", motion.step_count),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::readings::{LocationReading, MotionReading, Vector3};

    #[test]
    fn test_heading_to_direction() {
        assert_eq!(heading_to_direction(0.0), "N");
        assert_eq!(heading_to_direction(22.4), "N");
        assert_eq!(heading_to_direction(22.5), "NE");
        assert_eq!(heading_to_direction(90.0), "E");
        assert_eq!(heading_to_direction(180.0), "S");
        assert_eq!(heading_to_direction(270.0), "W");
        assert_eq!(heading_to_direction(337.5), "N");
        assert_eq!(heading_to_direction(359.9), "N");
        assert_eq!(heading_to_direction(-45.0), "NW");
    }

    #[test]
    fn test_format_lines() {
        let snapshot = TelemetrySnapshot {
            location: LocationReading {
                latitude: 37.7749,
                longitude: -122.4194,
                altitude: 142.3,
                speed: 10.0,
                course: 0.0,
                heading: 95.0,
            },
            motion: MotionReading {
                roll: 1.0,
                pitch: -2.0,
                yaw: 3.0,
                user_acceleration: Vector3::new(0.1, 0.0, 1.0),
                rotation_rate: Vector3::new(10.0, 0.0, -10.0),
                pressure: 101.3,
                relative_altitude: 0.0,
                step_count: 12,
                ..Default::default()
            },
            ..Default::default()
        };

        let lines = format_lines(&snapshot);
        assert_eq!(lines.len(), 9);
        assert_eq!(lines[0], "GPS: 37.774900°, -122.419400°");
        assert_eq!(lines[1], "ALT: 142.3m (GPS) | 0.0m (Rel)");
        assert_eq!(lines[2], "SPEED: 22.4 MPH");
        assert_eq!(lines[3], "HEADING: 95.0° E");
        assert_eq!(lines[4], "ORIENT: R:1.0° P:-2.0° Y:3.0°");
        assert_eq!(lines[5], "ACCEL: X:0.10 Y:0.00 Z:1.00 g");
        assert_eq!(lines[6], "ROTATION: X:10.0 Y:0.0 Z:-10.0 °/s");
        assert_eq!(lines[7], "PRESSURE: 101.30 kPa");
        assert_eq!(lines[8], "STEPS: 12");
    }

    #[test]
    fn test_negative_speed_is_clamped() {
        let snapshot = TelemetrySnapshot {
            location: LocationReading {
                speed: -1.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(format_lines(&snapshot)[2], "SPEED: 0.0 MPH");
    }
}
