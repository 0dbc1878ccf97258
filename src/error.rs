use std::io;

use thiserror::Error;

/// Custom error type for the gateway
#[derive(Debug, Error)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// Network endpoint errors
    #[error("network error: {0}")]
    Net(String),
    /// Serial link errors
    #[error("serial error: {0}")]
    Serial(String),
    /// Access point errors
    #[error("access point error: {0}")]
    Ap(String),
    /// Client slot errors
    #[error("client error: {0}")]
    Client(String),
}

impl From<serialport::Error> for Error {
    fn from(err: serialport::Error) -> Self {
        Error::Serial(err.to_string())
    }
}

/// Result type for the gateway
pub type Result<T> = std::result::Result<T, Error>;
