use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use serde::{Deserialize, Serialize};

use crate::control::AutomationSettings;
use crate::error::{Error, Result};

/// One ultrasonic measurement. Consumed immediately, never stored.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub distance_cm: f32,
    pub valid: bool,
}

impl SensorReading {
    pub fn valid(distance_cm: f32) -> Self {
        Self {
            distance_cm,
            valid: true,
        }
    }

    pub fn invalid() -> Self {
        Self {
            distance_cm: 0.0,
            valid: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterLevel {
    /// Fill percentage (0-100)
    pub percentage: u8,
    /// Distance from the sensor to the water surface (cm)
    pub distance_cm: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Switch {
    On,
    Off,
}

impl Switch {
    pub fn from_payload(text: &str) -> Option<Self> {
        match text {
            "ON" => Some(Switch::On),
            "OFF" => Some(Switch::Off),
            _ => None,
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Switch::On)
    }
}

impl From<bool> for Switch {
    fn from(on: bool) -> Self {
        if on { Switch::On } else { Switch::Off }
    }
}

impl fmt::Display for Switch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Switch::On => write!(f, "ON"),
            Switch::Off => write!(f, "OFF"),
        }
    }
}

/// Mutable device state owned by the controller for the lifetime of the
/// process. Timestamps are monotonic milliseconds.
#[derive(Debug, Clone, Default)]
pub struct DeviceState {
    pub motor_on: bool,
    pub led_on: [bool; 2],
    pub automation: AutomationSettings,
    pub last_link_check: u64,
    pub last_link_ok: u64,
    pub last_link_retry: u64,
    pub last_blink: u64,
    pub last_report: u64,
}

/// Telemetry document published on `<ns>/data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    pub level: u8,
    pub distance_cm: f32,
    pub motor: Switch,
    pub status: String,
}

impl Telemetry {
    pub const ONLINE: &'static str = "online";

    pub fn new(level: WaterLevel, motor_on: bool) -> Self {
        Self {
            level: level.percentage,
            distance_cm: level.distance_cm,
            motor: Switch::from(motor_on),
            status: String::from(Self::ONLINE),
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|_| Error::SerializationError)
    }
}
