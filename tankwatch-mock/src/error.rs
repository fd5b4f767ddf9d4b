use thiserror::Error;

#[derive(Debug, Error)]
pub enum MockError {
    #[error("Failed to parse settings: {0}")]
    Settings(#[from] toml::de::Error),
    #[error("Invalid broker address: {0}")]
    Address(#[from] std::net::AddrParseError),
    #[error("Broker link failed: {0}")]
    Link(#[from] rumqttd::local::LinkError),
    #[error("Device error: {0}")]
    Device(tankwatch_embedded::Error),
    #[error("Failed to spawn device thread: {0}")]
    Thread(#[from] std::io::Error),
}
