//! Configuration for the CodeMap engine.
//!
//! All values have built-in defaults; a YAML file can override them.

use serde::Deserialize;
use std::path::Path;

use crate::error::{Error, Result};

/// Default time-to-live for cached query results, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Default number of key registrations allowed per source IP per rolling hour.
pub const DEFAULT_REGISTRATIONS_PER_HOUR: u32 = 10;

/// Engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// TTL for cached query results, in seconds
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Registrations allowed per source IP per rolling hour
    #[serde(default = "default_registrations_per_hour")]
    pub registrations_per_hour: u32,
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_registrations_per_hour() -> u32 {
    DEFAULT_REGISTRATIONS_PER_HOUR
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL_SECS,
            registrations_per_hour: DEFAULT_REGISTRATIONS_PER_HOUR,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a YAML file.
    ///
    /// Missing keys fall back to their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| Error::Config(format!("cannot parse {}: {e}", path.display())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_applied() {
        let config = EngineConfig::default();
        assert_eq!(config.cache_ttl_secs, 3600);
        assert_eq!(config.registrations_per_hour, 10);
    }

    #[test]
    fn partial_yaml_falls_back_to_defaults() {
        let config: EngineConfig = serde_yaml::from_str("cache_ttl_secs: 60\n").unwrap();
        assert_eq!(config.cache_ttl_secs, 60);
        assert_eq!(config.registrations_per_hour, 10);
    }

    #[test]
    fn load_missing_file_is_a_config_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/codemap.yml")).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
