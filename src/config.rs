//! Index configuration.
//!
//! Everything that used to be ambient (storage location, search depth,
//! urban-center threshold, cache sizing) is an explicit [`Config`] passed
//! in at construction. The struct is designed to be easily serializable
//! and loadable from JSON while keeping complexity minimal.

use crate::cell::LEAF_CELL_LEVEL;
use crate::error::{GeoAnchorError, Result};
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for a [`CityIndex`](crate::index::CityIndex).
///
/// # Example
///
/// ```rust
/// use geoanchor::Config;
///
/// let config = Config::default();
/// assert_eq!(config.minimum_search_level, 7);
///
/// let json = r#"{
///     "minimum_search_level": 9,
///     "urban_center_minimum_population": 50000
/// }"#;
/// let config = Config::from_json(json).unwrap();
/// assert_eq!(config.urban_center_minimum_population, 50_000);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Coarsest precision level searched around a query point; lower
    /// levels cover larger regions. The default of 7 bounds the attraction
    /// radius to cells a few hundred kilometers across.
    #[serde(default = "Config::default_minimum_search_level")]
    pub minimum_search_level: u8,

    /// Minimum population for a place to count as an urban center.
    #[serde(default = "Config::default_urban_center_minimum_population")]
    pub urban_center_minimum_population: u64,

    /// Capacity of the nearest-result cache.
    #[serde(default = "Config::default_cache_capacity")]
    pub cache_capacity: usize,

    /// Backing snapshot file for the record store. `None` means a private
    /// temporary file that is deleted again when the index closes.
    #[serde(default)]
    pub store_path: Option<PathBuf>,

    /// Abort a load on malformed records instead of skipping them with a
    /// warning.
    #[serde(default)]
    pub strict_records: bool,
}

impl Config {
    const fn default_minimum_search_level() -> u8 {
        7
    }

    const fn default_urban_center_minimum_population() -> u64 {
        100_000
    }

    const fn default_cache_capacity() -> usize {
        100
    }

    pub fn with_minimum_search_level(mut self, level: u8) -> Self {
        self.minimum_search_level = level;
        self
    }

    pub fn with_urban_center_minimum_population(mut self, population: u64) -> Self {
        self.urban_center_minimum_population = population;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    pub fn with_store_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.store_path = Some(path.into());
        self
    }

    pub fn with_strict_records(mut self, strict: bool) -> Self {
        self.strict_records = strict;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.minimum_search_level > LEAF_CELL_LEVEL {
            return Err(GeoAnchorError::Config(format!(
                "minimum search level must be at most {}",
                LEAF_CELL_LEVEL
            )));
        }

        if self.urban_center_minimum_population == 0 {
            return Err(GeoAnchorError::Config(
                "urban-center population threshold must be greater than zero".to_string(),
            ));
        }

        if self.cache_capacity == 0 {
            return Err(GeoAnchorError::Config(
                "cache capacity must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// Load configuration from a JSON string.
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    /// Save configuration as a JSON string.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            minimum_search_level: Self::default_minimum_search_level(),
            urban_center_minimum_population: Self::default_urban_center_minimum_population(),
            cache_capacity: Self::default_cache_capacity(),
            store_path: None,
            strict_records: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.minimum_search_level, 7);
        assert_eq!(config.urban_center_minimum_population, 100_000);
        assert_eq!(config.cache_capacity, 100);
        assert!(config.store_path.is_none());
        assert!(!config.strict_records);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builders() {
        let config = Config::default()
            .with_minimum_search_level(9)
            .with_urban_center_minimum_population(50_000)
            .with_cache_capacity(16)
            .with_store_path("/tmp/index.bin")
            .with_strict_records(true);

        assert_eq!(config.minimum_search_level, 9);
        assert_eq!(config.urban_center_minimum_population, 50_000);
        assert_eq!(config.cache_capacity, 16);
        assert_eq!(config.store_path, Some(PathBuf::from("/tmp/index.bin")));
        assert!(config.strict_records);
    }

    #[test]
    fn test_config_validation() {
        let config = Config::default().with_minimum_search_level(31);
        assert!(config.validate().is_err());

        let config = Config::default().with_urban_center_minimum_population(0);
        assert!(config.validate().is_err());

        let config = Config::default().with_cache_capacity(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = Config::default()
            .with_minimum_search_level(8)
            .with_cache_capacity(32);

        let json = config.to_json().unwrap();
        let decoded = Config::from_json(&json).unwrap();

        assert_eq!(decoded.minimum_search_level, 8);
        assert_eq!(decoded.cache_capacity, 32);
        assert_eq!(
            decoded.urban_center_minimum_population,
            config.urban_center_minimum_population
        );
    }

    #[test]
    fn test_config_json_defaults() {
        let config = Config::from_json("{}").unwrap();
        assert_eq!(config.minimum_search_level, 7);
        assert_eq!(config.cache_capacity, 100);
    }

    #[test]
    fn test_config_json_rejects_invalid() {
        assert!(Config::from_json(r#"{"cache_capacity": 0}"#).is_err());
    }
}
