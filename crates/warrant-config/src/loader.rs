//! Config file loading.
//!
//! Implements the `Config::load()` algorithm:
//! 1. Parse `defaults.toml` → base
//! 2. Merge the config file, if one is given and exists
//! 3. Apply `WARRANT_*` env var fallbacks for fields the file did not set
//! 4. Deserialize merged tree → `Config`
//! 5. Validate

use std::collections::HashMap;
use std::path::Path;

use tracing::{debug, info};

use crate::env::{apply_env_fallbacks, collect_env_vars};
use crate::error::{ConfigError, ConfigResult};
use crate::merge::{FieldSources, deep_merge_tracking};
use crate::types::Config;
use crate::validate;

/// Embedded default configuration.
const DEFAULTS_TOML: &str = include_str!("defaults.toml");

/// Maximum allowed config file size (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the configuration from the defaults, an optional file and the
/// process environment.
///
/// A missing file is not an error; the defaults apply.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file cannot be read or parsed, if an
/// env var is malformed, or if the final configuration fails validation.
pub fn load(path: Option<&Path>) -> ConfigResult<Config> {
    load_with_env(path, &collect_env_vars())
}

/// Like [`load`], with an explicit environment.
///
/// # Errors
///
/// See [`load`].
pub fn load_with_env<S: ::std::hash::BuildHasher>(
    path: Option<&Path>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    let overlay = match path {
        Some(path) => try_load_file(path)?.map(|overlay| (overlay, path.display().to_string())),
        None => None,
    };

    build(overlay, env_vars)
}

/// Load the configuration from TOML text layered over the defaults.
///
/// Env fallbacks are not applied.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the text does not parse or the result fails
/// validation.
pub fn load_str(content: &str) -> ConfigResult<Config> {
    let overlay = parse_toml(content, "<inline config>")?;
    build(Some((overlay, "<inline config>".to_owned())), &HashMap::new())
}

fn build<S: ::std::hash::BuildHasher>(
    overlay: Option<(toml::Value, String)>,
    env_vars: &HashMap<String, String, S>,
) -> ConfigResult<Config> {
    // 1. Parse embedded defaults.
    let mut merged = parse_toml(DEFAULTS_TOML, "<embedded defaults>")?;
    let mut field_sources = FieldSources::new();

    // 2. Config file.
    if let Some((overlay, origin)) = overlay {
        deep_merge_tracking(&mut merged, &overlay, "", &mut field_sources);
        info!(path = %origin, "loaded config");
    }

    // 3. Env var fallbacks for unset fields.
    let env_count = apply_env_fallbacks(&mut merged, &mut field_sources, env_vars)?;
    if env_count > 0 {
        debug!(count = env_count, "applied environment variable fallbacks");
    }

    // 4. Deserialize.
    let config: Config =
        merged
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::ParseError {
                path: "<merged config>".to_owned(),
                source: e,
            })?;

    // 5. Validate.
    validate::validate(&config)?;

    Ok(config)
}

fn parse_toml(content: &str, origin: &str) -> ConfigResult<toml::Value> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        path: origin.to_owned(),
        source: e,
    })
}

/// Try to load a file, returning `None` if the file doesn't exist.
///
/// Uses a single read operation to avoid TOCTOU races (no separate
/// exists/metadata checks before reading).
fn try_load_file(path: &Path) -> ConfigResult<Option<toml::Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "config file not found, skipping");
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ReadError {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    // Check size after reading to avoid TOCTOU between stat and read.
    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::ValidationError {
            field: path.display().to_string(),
            message: format!(
                "config file is {} bytes, exceeding the {} byte limit",
                content.len(),
                MAX_CONFIG_FILE_SIZE
            ),
        });
    }

    parse_toml(&content, &path.display().to_string()).map(Some)
}
