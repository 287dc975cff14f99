use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Authorization decision settings.
    pub authorizer: AuthorizerSection,
    /// Logging and tracing settings.
    pub logging: LoggingSection,
    /// Role name to the permission grants it expands to.
    pub roles: HashMap<String, Vec<String>>,
}

// ---------------------------------------------------------------------------
// AuthorizerSection
// ---------------------------------------------------------------------------

/// Authorization decision settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorizerSection {
    /// Resources that are always authorized.
    pub ignored_resources: Vec<String>,
    /// Maximum number of cached permission maps.
    pub cache_capacity: usize,
    /// Base lifetime of a cached permission map, in seconds.
    pub cache_ttl_secs: u64,
    /// Upper bound of the random extra lifetime, in seconds.
    pub cache_ttl_jitter_secs: u64,
}

impl Default for AuthorizerSection {
    fn default() -> Self {
        Self {
            ignored_resources: Vec::new(),
            cache_capacity: 24_000,
            cache_ttl_secs: 3600,
            cache_ttl_jitter_secs: 1800,
        }
    }
}

impl AuthorizerSection {
    /// Base cache lifetime.
    #[must_use]
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// Upper bound of the random extra cache lifetime.
    #[must_use]
    pub fn cache_ttl_jitter(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_jitter_secs)
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging and tracing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Global log level filter (`"trace"`, `"debug"`, `"info"`, `"warn"`,
    /// `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate tracing directives (e.g. `["warrant_policy=debug"]`).
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
        }
    }
}
