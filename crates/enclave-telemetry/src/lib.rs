//! Enclave Telemetry - logging setup for the Enclave crates.
//!
//! Library crates only emit `tracing` events; binaries call
//! [`setup_logging`] once at startup and hold the returned guard.
//!
//! # Example
//!
//! ```rust,no_run
//! use enclave_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), enclave_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("enclave_vfs=debug");
//! let _guard = setup_logging(&config)?;
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
    FileRotation, LogConfig, LogFormat, LogTarget, LoggingGuard, setup_default_logging,
    setup_logging,
};
