use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // Challenge / wire format errors
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(String),

    // Value type errors
    #[error("Invalid username: {0}")]
    InvalidUsername(String),

    #[error("Invalid AIN: {0}")]
    InvalidAin(String),

    // XML errors
    #[error("Missing required element: {0}")]
    MissingElement(String),

    #[error("XML error: {0}")]
    Xml(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing configuration key: {0}")]
    MissingConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
