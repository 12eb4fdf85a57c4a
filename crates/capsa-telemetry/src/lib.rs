//! Capsa Telemetry - Logging setup for capsa tools.
//!
//! Libraries in this workspace only emit `tracing` events. Binaries call
//! [`setup_logging`] once at startup to decide where those events go.
//!
//! # Example
//!
//! ```rust,no_run
//! use capsa_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), capsa_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Pretty)
//!     .with_directive("capsa_core=debug");
//! setup_logging(&config)?;
//!
//! tracing::info!("ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    LOG_ENV, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
