//! Warrant Telemetry - logging setup for the Warrant authorizer.
//!
//! Installs a `tracing` subscriber with a level filter, per-crate
//! directives and one of four output formats, writing to stdout, stderr
//! or rolling files.
//!
//! # Example
//!
//! ```rust,no_run
//! use warrant_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), warrant_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Json)
//!     .with_directive("warrant_policy=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("authorizer ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
