//! Application configuration
//!
//! Loaded from `<config>/drift/config.toml` when present; every field has a
//! default so a missing file is not an error. The config carries the local
//! profile name (the user scope passed to the store), the database path
//! override, and the engine defaults that are not part of a strategy.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// User scope for all store operations
    pub profile: String,
    /// Database path override; falls back to ~/.drift/data.db
    pub database_path: Option<PathBuf>,
    /// Threshold used for the drift summary when no strategy is active
    pub default_drift_threshold: Decimal,
    /// Holding-period threshold for the long-term flag, in days
    pub long_term_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: "default".to_string(),
            database_path: None,
            default_drift_threshold: Decimal::from(5),
            long_term_days: 365,
        }
    }
}

/// Path of the config file (`<config>/drift/config.toml`)
pub fn config_file_path() -> Option<PathBuf> {
    dir_spec::config_home().map(|dir| dir.join("drift").join("config.toml"))
}

/// Load the config file, or the defaults when it does not exist
pub fn load() -> Result<Config> {
    let Some(path) = config_file_path() else {
        debug!("No config directory available; using defaults");
        return Ok(Config::default());
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config at {:?}", path))?;
    let config: Config =
        toml::from_str(&raw).with_context(|| format!("Failed to parse config at {:?}", path))?;

    debug!("Loaded config from {:?}", path);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.profile, "default");
        assert!(config.database_path.is_none());
        assert_eq!(config.default_drift_threshold, dec!(5));
        assert_eq!(config.long_term_days, 365);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("profile = \"family\"").unwrap();
        assert_eq!(config.profile, "family");
        assert_eq!(config.long_term_days, 365);
    }

    #[test]
    fn test_full_file_round_trip() {
        let raw = r#"
profile = "alice"
database_path = "/tmp/drift-test.db"
default_drift_threshold = "7.5"
long_term_days = 730
"#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.profile, "alice");
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/drift-test.db")));
        assert_eq!(config.default_drift_threshold, dec!(7.5));
        assert_eq!(config.long_term_days, 730);
    }
}
