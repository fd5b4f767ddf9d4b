use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    NotConnected,
    PublishFailed,
    SerializationError,
    EchoTimeout,
    SensorReadingOutOfRange,
    InvalidConfig,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotConnected => write!(f, "Not connected"),
            Error::PublishFailed => write!(f, "Publish failed"),
            Error::SerializationError => write!(f, "Serialization error"),
            Error::EchoTimeout => write!(f, "No echo received before timeout"),
            Error::SensorReadingOutOfRange => write!(f, "Sensor reading out of valid range"),
            Error::InvalidConfig => write!(f, "Invalid configuration"),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
