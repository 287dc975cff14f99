//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::Config;

/// Upper bound of `authorizer.cache_ttl_secs` and
/// `authorizer.cache_ttl_jitter_secs` (one week).
const MAX_CACHE_TTL_SECS: u64 = 604_800;

/// Validate a fully-merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_authorizer(config)?;
    validate_logging(config)?;
    validate_roles(config)?;
    Ok(())
}

fn validate_authorizer(config: &Config) -> ConfigResult<()> {
    let a = &config.authorizer;

    if a.cache_capacity == 0 {
        return Err(ConfigError::ValidationError {
            field: "authorizer.cache_capacity".to_owned(),
            message: "must be greater than 0".to_owned(),
        });
    }

    if a.cache_ttl_secs > MAX_CACHE_TTL_SECS {
        return Err(ConfigError::ValidationError {
            field: "authorizer.cache_ttl_secs".to_owned(),
            message: format!(
                "{} exceeds the maximum of {MAX_CACHE_TTL_SECS}",
                a.cache_ttl_secs
            ),
        });
    }

    if a.cache_ttl_jitter_secs > MAX_CACHE_TTL_SECS {
        return Err(ConfigError::ValidationError {
            field: "authorizer.cache_ttl_jitter_secs".to_owned(),
            message: format!(
                "{} exceeds the maximum of {MAX_CACHE_TTL_SECS}",
                a.cache_ttl_jitter_secs
            ),
        });
    }

    if let Some(blank) = a.ignored_resources.iter().find(|r| r.trim().is_empty()) {
        return Err(ConfigError::ValidationError {
            field: "authorizer.ignored_resources".to_owned(),
            message: format!("'{blank}' is not a resource name"),
        });
    }

    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.logging.level.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.level".to_owned(),
            message: format!(
                "unsupported log level '{}'; expected one of: {}",
                config.logging.level,
                valid_levels.join(", ")
            ),
        });
    }

    let valid_formats = ["pretty", "compact", "json", "full"];
    if !valid_formats.contains(&config.logging.format.as_str()) {
        return Err(ConfigError::ValidationError {
            field: "logging.format".to_owned(),
            message: format!(
                "unsupported log format '{}'; expected one of: {}",
                config.logging.format,
                valid_formats.join(", ")
            ),
        });
    }

    Ok(())
}

fn validate_roles(config: &Config) -> ConfigResult<()> {
    for (role, grants) in &config.roles {
        if role.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                field: "roles".to_owned(),
                message: "role names must not be blank".to_owned(),
            });
        }

        if grants.iter().any(|g| g.trim().is_empty()) {
            return Err(ConfigError::ValidationError {
                field: format!("roles.{role}"),
                message: "grants must not be blank".to_owned(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = Config::default();
        config.authorizer.cache_capacity = 0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("authorizer.cache_capacity"));
    }

    #[test]
    fn test_excessive_ttl_rejected() {
        let mut config = Config::default();
        config.authorizer.cache_ttl_secs = u64::MAX;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_ignored_resource_rejected() {
        let mut config = Config::default();
        config.authorizer.ignored_resources = vec![" ".to_owned()];
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_owned();
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_invalid_log_format() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_blank_role_grant_rejected() {
        let mut config = Config::default();
        config
            .roles
            .insert("editor".to_owned(), vec![String::new()]);
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("roles.editor"));
    }
}
