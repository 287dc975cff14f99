#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Configuration for the Warrant authorizer.
//!
//! A single [`Config`] type carries the authorizer's cache and bypass
//! settings, the logging setup and the role table used to expand
//! role grants.
//!
//! # Usage
//!
//! ```rust,no_run
//! use warrant_config::Config;
//!
//! let config = Config::load(Some(std::path::Path::new("warrant.toml"))).unwrap();
//! println!("cache capacity: {}", config.authorizer.cache_capacity);
//! ```
//!
//! # Configuration Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Config file** (the path handed to [`Config::load`])
//! 2. **Environment variables** (`WARRANT_*`), fallback only
//! 3. **Embedded defaults** (`defaults.toml` compiled into the binary)
//!
//! This crate has no dependencies on other internal warrant crates.

/// Configuration error types.
mod error;
/// Environment variable fallback resolution.
pub mod env;
/// Configuration file loading.
pub mod loader;
/// Layered configuration merging.
pub mod merge;
/// Configuration struct definitions.
mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use types::{AuthorizerSection, Config, LoggingSection};

impl Config {
    /// Load configuration from the defaults, an optional file and the
    /// `WARRANT_*` environment.
    ///
    /// See [`loader::load`] for the full algorithm.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file is malformed or the final
    /// configuration fails validation.
    pub fn load(path: Option<&std::path::Path>) -> ConfigResult<Self> {
        loader::load(path)
    }

    /// Parse configuration from TOML text layered over the defaults.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the text does not parse or fails
    /// validation.
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        loader::load_str(content)
    }
}
