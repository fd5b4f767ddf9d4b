use serde::{Deserialize, Serialize};

use tankwatch_embedded::network::RetryPolicy;
use tankwatch_embedded::{NetworkConfig, TankConfig};

use crate::error::MockError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Broker {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Retry {
    Blocking,
    Deferred,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub namespace: String,
    pub client_id_prefix: String,
    pub tank_height_cm: f32,
    pub report_interval_ms: u64,
    pub retry_policy: Retry,
    pub blink_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Starting fill percentage
    pub initial_level: f32,
    pub drain_cm_per_min: f32,
    pub fill_cm_per_min: f32,
    pub noise_cm: f32,
    /// Probability that a ping gets no echo
    pub echo_loss_rate: f64,
    pub link_drop_every_s: Option<u64>,
    pub link_drop_for_s: u64,
    /// Broker connects refused before the first one is let through
    pub session_refusals: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScriptedCommand {
    pub after_s: u64,
    /// Topic below the device namespace
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dashboard {
    #[serde(default)]
    pub commands: Vec<ScriptedCommand>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub broker: Broker,
    pub device: Device,
    pub simulation: Simulation,
    #[serde(default)]
    pub dashboard: Dashboard,
}

impl Settings {
    pub fn new() -> Result<Self, MockError> {
        Self::from_toml(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        )))
    }

    pub fn from_toml(source: &str) -> Result<Self, MockError> {
        let settings: Settings = toml::from_str(source)?;
        settings.tank_config().validate().map_err(MockError::Device)?;
        Ok(settings)
    }

    pub fn tank_config(&self) -> TankConfig {
        TankConfig::default()
            .with_tank_height(self.device.tank_height_cm)
            .with_report_interval(self.device.report_interval_ms)
            .with_blink(self.device.blink_enabled)
    }

    /// Device-side view of the broker: the local mock listener.
    pub fn network_config(&self) -> NetworkConfig {
        let retry = match self.device.retry_policy {
            Retry::Blocking => RetryPolicy::Blocking,
            Retry::Deferred => RetryPolicy::Deferred,
        };

        NetworkConfig::default()
            .with_namespace(&self.device.namespace)
            .with_client_id_prefix(&self.device.client_id_prefix)
            .with_broker(&self.broker.address, self.broker.port)
            .with_retry_policy(retry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_load() {
        let settings = Settings::new().unwrap();

        assert_eq!(settings.device.namespace, "thomson_h2o");
        assert_eq!(settings.network_config().broker_url(), "mqtt://127.0.0.1:1883");
        assert!(!settings.dashboard.commands.is_empty());
    }

    #[test]
    fn test_invalid_tank_rejected() {
        let source = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        ))
        .replace("tank_height_cm = 100.0", "tank_height_cm = 0.0");

        assert!(matches!(
            Settings::from_toml(&source),
            Err(MockError::Device(tankwatch_embedded::Error::InvalidConfig))
        ));
    }
}
