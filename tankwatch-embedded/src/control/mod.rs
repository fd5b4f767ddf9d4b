mod automation;

pub use automation::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_MIN_LEVEL: u8 = 20;
pub const DEFAULT_MAX_LEVEL: u8 = 90;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PumpMode {
    Auto,
    #[default]
    Manual,
}

/// Pump automation thresholds pushed by the dashboard on
/// `<ns>/settings/config`. Unknown fields in the document are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutomationSettings {
    pub min_level: u8,
    pub max_level: u8,
    #[serde(default)]
    pub mode: PumpMode,
}

impl Default for AutomationSettings {
    fn default() -> Self {
        Self {
            min_level: DEFAULT_MIN_LEVEL,
            max_level: DEFAULT_MAX_LEVEL,
            mode: PumpMode::default(),
        }
    }
}

impl AutomationSettings {
    /// Parses a settings document, rejecting an empty or inverted band.
    pub fn from_json(payload: &[u8]) -> Option<Self> {
        let settings: Self = serde_json::from_slice(payload).ok()?;
        (settings.min_level < settings.max_level && settings.max_level <= 100).then_some(settings)
    }
}
