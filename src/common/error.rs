//! Error types for minidfs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    // === I/O Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // === Placement Errors ===
    #[error("No available datanodes to place blocks on")]
    NoCapacity,

    #[error("File of {size} bytes needs {blocks} blocks, limit is {max}")]
    FileTooLarge { size: u64, blocks: u64, max: u64 },

    // === Metadata Errors ===
    #[error("File not found: {0}")]
    FileNotFound(String),

    // === Datanode Errors ===
    #[error("Invalid block id: {0}")]
    InvalidBlockId(String),

    #[error("Invalid block payload: {0}")]
    InvalidPayload(String),

    // === Network Errors ===
    #[error("HTTP error: {0}")]
    Http(String),

    // === Config Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // === Generic ===
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Convert to HTTP status code
    pub fn to_http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Error::FileNotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidBlockId(_) | Error::InvalidPayload(_) | Error::InvalidConfig(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::FileTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::NoCapacity => StatusCode::SERVICE_UNAVAILABLE,
            Error::Http(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Http(e.to_string())
    }
}

impl From<config::ConfigError> for Error {
    fn from(e: config::ConfigError) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
