//! Service configuration.
//!
//! Loaded from a RON file; every field has a default so an empty document
//! `()` is a valid config.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ServiceError};

/// Monte-Carlo runs for attack simulations when the request gives none.
pub const DEFAULT_SIMULATIONS: u32 = 1000;

/// Service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Directory the file backend stores games under.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
    /// Rules document to load at startup.
    #[serde(default)]
    pub rules_path: Option<PathBuf>,
    /// Keep loaded games in memory between requests.
    #[serde(default)]
    pub cache_games: bool,
    /// Simulation count for attack previews.
    #[serde(default = "default_simulations")]
    pub default_simulations: u32,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("games")
}

const fn default_simulations() -> u32 {
    DEFAULT_SIMULATIONS
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            storage_root: default_storage_root(),
            rules_path: None,
            cache_games: false,
            default_simulations: DEFAULT_SIMULATIONS,
        }
    }
}

impl ServiceConfig {
    /// Parse a config from RON.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Serialization`] if the document does not parse.
    pub fn from_ron_str(source: &str) -> Result<Self> {
        ron::from_str(source)
            .map_err(|e| ServiceError::Serialization(format!("invalid service config: {e}")))
    }

    /// Read and parse a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Io`] if the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| ServiceError::io(path, e))?;
        Self::from_ron_str(&source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = ServiceConfig::from_ron_str("()").unwrap();
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.default_simulations, 1000);
        assert!(!config.cache_games);
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_ron_str(
            r#"(storage_root: "/var/hexwar", cache_games: true, rules_path: Some("rules.ron"))"#,
        )
        .unwrap();
        assert_eq!(config.storage_root, PathBuf::from("/var/hexwar"));
        assert!(config.cache_games);
        assert_eq!(config.rules_path, Some(PathBuf::from("rules.ron")));
    }

    #[test]
    fn test_bad_config_is_a_serialization_error() {
        let err = ServiceConfig::from_ron_str("(cache_games: 3)").unwrap_err();
        assert!(matches!(err, ServiceError::Serialization(_)));
    }
}
