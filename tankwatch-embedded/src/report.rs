use crate::control::motor_target;
use crate::error::{Error, Result};
use crate::sensor::to_level;
use crate::time::is_due;
use crate::types::{DeviceState, SensorReading, Telemetry};

/// Decides when a report is due and turns a reading into telemetry.
#[derive(Debug, Clone)]
pub struct ReportingScheduler {
    interval_ms: u64,
    tank_height_cm: f32,
    max_distance_cm: f32,
}

impl ReportingScheduler {
    pub fn new(interval_ms: u64, tank_height_cm: f32, max_distance_cm: f32) -> Self {
        Self {
            interval_ms,
            tank_height_cm,
            max_distance_cm,
        }
    }

    pub fn is_due(&self, state: &DeviceState, now_ms: u64) -> bool {
        is_due(now_ms, state.last_report, self.interval_ms)
    }

    /// Validates the reading, applies pump automation to `state` and builds
    /// the telemetry document. Invalid readings leave `state` untouched.
    pub fn prepare(&self, state: &mut DeviceState, reading: SensorReading) -> Result<Telemetry> {
        if !reading.valid {
            return Err(Error::EchoTimeout);
        }
        if !(reading.distance_cm >= 0.0 && reading.distance_cm <= self.max_distance_cm) {
            log::warn!("Distance {:.1} cm out of range", reading.distance_cm);
            return Err(Error::SensorReadingOutOfRange);
        }

        let level = to_level(reading.distance_cm, self.tank_height_cm);

        let target = motor_target(&state.automation, level.percentage, state.motor_on);
        if target != state.motor_on {
            log::info!(
                "Level {}%, automation turning motor {}",
                level.percentage,
                if target { "ON" } else { "OFF" }
            );
            state.motor_on = target;
        }

        if level.percentage < state.automation.min_level {
            log::warn!(
                "Water level low: {}% (threshold {}%)",
                level.percentage,
                state.automation.min_level
            );
        }

        Ok(Telemetry::new(level, state.motor_on))
    }
}
