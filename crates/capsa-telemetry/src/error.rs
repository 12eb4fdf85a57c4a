//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A level or directive could not be parsed.
    #[error("invalid log filter: {0}")]
    InvalidFilter(String),

    /// Unknown log format name.
    #[error("unknown log format: {0}")]
    UnknownFormat(String),

    /// A global subscriber is already installed.
    #[error("logging initialization failed: {0}")]
    Init(String),

    /// The log directory could not be created.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
