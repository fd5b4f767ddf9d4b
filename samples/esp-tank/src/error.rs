use esp_idf_svc::sys::EspError;

#[derive(thiserror::Error, Debug)]
pub enum TankError {
    #[error("ESP error: {0}")]
    Esp(#[from] EspError),

    #[error("MQTT connect timed out")]
    ConnectTimeout,

    #[error("MQTT broker closed the connection")]
    Rejected,

    #[error("MQTT session not established")]
    NotConnected,

    #[error("Failed to spawn MQTT event task: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = core::result::Result<T, TankError>;
