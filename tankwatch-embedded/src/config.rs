use alloc::format;
use alloc::string::String;

use crate::error::{Error, Result};
use crate::network::{LinkPolicy, RetryPolicy};

pub const DEFAULT_NAMESPACE: &str = "thomson_h2o";
pub const DEFAULT_CLIENT_ID_PREFIX: &str = "ESP32Client";
pub const DEFAULT_BROKER_HOST: &str = "broker.hivemq.com";
pub const DEFAULT_BROKER_PORT: u16 = 1883;

pub const DEFAULT_TANK_HEIGHT_CM: f32 = 100.0;
pub const DEFAULT_ECHO_TIMEOUT_US: u32 = 30_000;
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 5_000;
pub const MAX_VALID_DISTANCE_CM: f32 = 500.0;

pub const LINK_CHECK_INTERVAL_MS: u64 = 1_000;
pub const LINK_RETRY_INTERVAL_MS: u64 = 5_000;
pub const LINK_POLL_INTERVAL_MS: u32 = 500;
pub const DEFAULT_LINK_POLL_LIMIT: u32 = 20;
pub const SESSION_RETRY_DELAY_MS: u64 = 5_000;
pub const STATUS_BLINK_INTERVAL_MS: u64 = 500;

/// GPIO numbers, consumed by board bring-up code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinConfig {
    pub trigger: u8,
    pub echo: u8,
    pub leds: [u8; 2],
    pub status: u8,
}

impl Default for PinConfig {
    fn default() -> Self {
        Self {
            trigger: 5,
            echo: 18,
            leds: [4, 22],
            status: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TankConfig {
    pub pins: PinConfig,
    pub tank_height_cm: f32,
    pub echo_timeout_us: u32,
    pub report_interval_ms: u64,
    pub max_distance_cm: f32,
    /// Whether the LED topic accepts the synchronous `BLINK` sequence
    pub blink_enabled: bool,
}

impl Default for TankConfig {
    fn default() -> Self {
        Self {
            pins: PinConfig::default(),
            tank_height_cm: DEFAULT_TANK_HEIGHT_CM,
            echo_timeout_us: DEFAULT_ECHO_TIMEOUT_US,
            report_interval_ms: DEFAULT_REPORT_INTERVAL_MS,
            max_distance_cm: MAX_VALID_DISTANCE_CM,
            blink_enabled: true,
        }
    }
}

impl TankConfig {
    pub fn with_tank_height(mut self, tank_height_cm: f32) -> Self {
        self.tank_height_cm = tank_height_cm;
        self
    }

    pub fn with_report_interval(mut self, interval_ms: u64) -> Self {
        self.report_interval_ms = interval_ms;
        self
    }

    pub fn with_echo_timeout(mut self, timeout_us: u32) -> Self {
        self.echo_timeout_us = timeout_us;
        self
    }

    pub fn with_blink(mut self, enabled: bool) -> Self {
        self.blink_enabled = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tank_height_cm > 0.0) || self.report_interval_ms == 0 || self.echo_timeout_us == 0
        {
            return Err(Error::InvalidConfig);
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub namespace: String,
    pub client_id_prefix: String,
    pub broker_host: String,
    pub broker_port: u16,
    pub link_policy: LinkPolicy,
    pub retry_policy: RetryPolicy,
    pub link_check_interval_ms: u64,
    pub link_retry_interval_ms: u64,
    pub session_retry_delay_ms: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            namespace: String::from(DEFAULT_NAMESPACE),
            client_id_prefix: String::from(DEFAULT_CLIENT_ID_PREFIX),
            broker_host: String::from(DEFAULT_BROKER_HOST),
            broker_port: DEFAULT_BROKER_PORT,
            link_policy: LinkPolicy::Capped {
                polls: DEFAULT_LINK_POLL_LIMIT,
            },
            retry_policy: RetryPolicy::Blocking,
            link_check_interval_ms: LINK_CHECK_INTERVAL_MS,
            link_retry_interval_ms: LINK_RETRY_INTERVAL_MS,
            session_retry_delay_ms: SESSION_RETRY_DELAY_MS,
        }
    }
}

impl NetworkConfig {
    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.namespace = String::from(namespace);
        self
    }

    pub fn with_client_id_prefix(mut self, prefix: &str) -> Self {
        self.client_id_prefix = String::from(prefix);
        self
    }

    pub fn with_broker(mut self, host: &str, port: u16) -> Self {
        self.broker_host = String::from(host);
        self.broker_port = port;
        self
    }

    pub fn with_link_policy(mut self, policy: LinkPolicy) -> Self {
        self.link_policy = policy;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = policy;
        self
    }

    pub fn broker_url(&self) -> String {
        format!("mqtt://{}:{}", self.broker_host, self.broker_port)
    }

    pub fn topics(&self) -> Topics {
        Topics::new(&self.namespace)
    }
}

/// Topic names derived from the namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topics {
    pub data: String,
    pub led_command: String,
    pub motor_command: String,
    pub settings: String,
}

impl Topics {
    pub fn new(namespace: &str) -> Self {
        Self {
            data: format!("{namespace}/data"),
            led_command: format!("{namespace}/led/cmd"),
            motor_command: format!("{namespace}/motor/command"),
            settings: format!("{namespace}/settings/config"),
        }
    }

    /// Topics the device subscribes to after every session (re)connect.
    pub fn subscriptions(&self) -> [&str; 3] {
        [
            self.led_command.as_str(),
            self.motor_command.as_str(),
            self.settings.as_str(),
        ]
    }
}
