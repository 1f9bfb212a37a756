//! Configuration management for the Waypost proximity notifier.
//!
//! Supports loading from YAML files with environment variable overrides
//! (prefix `WAYPOST`, separator `__`) and validation of all settings:
//! predefined POIs, monitoring parameters, map defaults, and logging.

use crate::error::{ConfigError, Result};
use crate::types::{LatLng, Poi, PoiKey};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Main application configuration.
///
/// # Examples
///
/// ```no_run
/// use waypost_core::config::AppConfig;
///
/// let config = AppConfig::from_file("config/config.yaml").unwrap();
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Predefined points of interest placed at startup
    #[serde(default)]
    pub pois: Vec<PoiConfig>,

    /// Arrival monitoring parameters
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Map surface defaults
    #[serde(default)]
    pub map: MapConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::load_failed(path.display().to_string(), e.to_string())
        })?;

        Self::from_yaml(&contents)
    }

    /// Loads configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Loads configuration using the `config` crate, which merges the file
    /// with environment variable overrides (`WAYPOST_*`).
    pub fn from_config_builder<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = config::Config::builder()
            .add_source(config::File::from(path).required(true))
            .add_source(
                config::Environment::with_prefix("WAYPOST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| ConfigError::load_failed(path.display().to_string(), e.to_string()))?;

        config.try_deserialize().map_err(|e| {
            ConfigError::InvalidFormat {
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Validates the full configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violation found: duplicate or empty POI keys,
    /// out-of-range coordinates, a non-positive radius, or a zero timeout.
    pub fn validate(&self) -> Result<()> {
        let mut seen: HashSet<&str> = HashSet::new();
        for poi in &self.pois {
            if poi.key.is_empty() {
                return Err(ConfigError::validation_failed("POI key cannot be empty").into());
            }
            if !seen.insert(poi.key.as_str()) {
                return Err(ConfigError::DuplicatePoiKey {
                    key: poi.key.clone(),
                }
                .into());
            }
            if !poi.location().is_valid() {
                return Err(ConfigError::invalid_value(
                    format!("pois.{}", poi.key),
                    format!("coordinates out of range: {}, {}", poi.lat, poi.lng),
                )
                .into());
            }
        }

        self.monitor.validate()?;
        self.map.validate()?;
        Ok(())
    }

    /// Builds the POI list from the configured entries.
    pub fn poi_list(&self) -> Vec<Poi> {
        self.pois.iter().map(PoiConfig::to_poi).collect()
    }
}

/// A predefined point of interest from the configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoiConfig {
    /// Unique key
    pub key: String,
    /// Display name (defaults to the key)
    #[serde(default)]
    pub name: Option<String>,
    /// Latitude in decimal degrees
    pub lat: f64,
    /// Longitude in decimal degrees
    pub lng: f64,
}

impl PoiConfig {
    /// Returns the configured location.
    pub fn location(&self) -> LatLng {
        LatLng::new(self.lat, self.lng)
    }

    /// Converts the entry to a [`Poi`].
    pub fn to_poi(&self) -> Poi {
        Poi::new(
            PoiKey::new(&self.key),
            self.name.clone().unwrap_or_else(|| self.key.clone()),
            self.location(),
        )
    }
}

/// Arrival monitoring parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Proximity circle radius in meters
    #[serde(default = "default_radius_m")]
    pub radius_m: f64,

    /// Maximum staleness per position update, in milliseconds
    #[serde(default = "default_watch_timeout_ms")]
    pub watch_timeout_ms: u64,

    /// Request high-accuracy fixes from the source
    #[serde(default = "default_high_accuracy")]
    pub high_accuracy: bool,
}

fn default_radius_m() -> f64 {
    800.0
}

fn default_watch_timeout_ms() -> u64 {
    10_000
}

fn default_high_accuracy() -> bool {
    true
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            radius_m: default_radius_m(),
            watch_timeout_ms: default_watch_timeout_ms(),
            high_accuracy: default_high_accuracy(),
        }
    }
}

impl MonitorConfig {
    /// Returns the staleness window as a [`Duration`].
    pub fn watch_timeout(&self) -> Duration {
        Duration::from_millis(self.watch_timeout_ms)
    }

    /// Validates the monitoring parameters.
    pub fn validate(&self) -> Result<()> {
        if !(self.radius_m > 0.0) {
            return Err(
                ConfigError::invalid_value("monitor.radius_m", "must be positive").into(),
            );
        }
        if self.watch_timeout_ms == 0 {
            return Err(
                ConfigError::invalid_value("monitor.watch_timeout_ms", "must be nonzero").into(),
            );
        }
        Ok(())
    }
}

/// Map surface defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapConfig {
    /// Initial map center latitude
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,

    /// Initial map center longitude
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,

    /// Initial zoom level
    #[serde(default = "default_zoom")]
    pub zoom: f64,

    /// Tile URL template overriding OpenStreetMap
    /// (`https://.../{z}/{x}/{y}.png`)
    #[serde(default)]
    pub tile_url: Option<String>,
}

fn default_center_lat() -> f64 {
    33.46836
}

fn default_center_lng() -> f64 {
    -84.66599
}

fn default_zoom() -> f64 {
    12.0
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            zoom: default_zoom(),
            tile_url: None,
        }
    }
}

impl MapConfig {
    /// Returns the configured map center.
    pub fn center(&self) -> LatLng {
        LatLng::new(self.center_lat, self.center_lng)
    }

    /// Validates the map defaults.
    pub fn validate(&self) -> Result<()> {
        if !self.center().is_valid() {
            return Err(
                ConfigError::invalid_value("map.center", "coordinates out of range").into(),
            );
        }
        if !(0.0..=22.0).contains(&self.zoom) {
            return Err(ConfigError::invalid_value("map.zoom", "must be in 0..=22").into());
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON-formatted log lines
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
pois:
  - key: home
    name: Home
    lat: 33.46836
    lng: -84.66599
  - key: office
    lat: 33.74900
    lng: -84.38800
monitor:
  radius_m: 800.0
  watch_timeout_ms: 10000
map:
  center_lat: 33.5
  center_lng: -84.5
logging:
  level: debug
"#;

    #[test]
    fn test_parse_sample_config() {
        let config = AppConfig::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.pois.len(), 2);
        assert_eq!(config.monitor.radius_m, 800.0);
        assert_eq!(config.logging.level, "debug");
        config.validate().unwrap();

        let pois = config.poi_list();
        assert_eq!(pois[0].name, "Home");
        // name defaults to the key when omitted
        assert_eq!(pois[1].name, "office");
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_yaml("{}").unwrap();
        assert!(config.pois.is_empty());
        assert_eq!(config.monitor.radius_m, 800.0);
        assert_eq!(config.monitor.watch_timeout_ms, 10_000);
        assert!(config.monitor.high_accuracy);
        assert_eq!(config.map.zoom, 12.0);
        config.validate().unwrap();
    }

    #[test]
    fn test_out_of_range_zoom_rejected() {
        let yaml = "map:\n  zoom: 40.0\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_poi_key_rejected() {
        let yaml = r#"
pois:
  - { key: a, lat: 1.0, lng: 2.0 }
  - { key: a, lat: 3.0, lng: 4.0 }
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_radius_rejected() {
        let yaml = "monitor:\n  radius_m: 0.0\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_out_of_range_poi_rejected() {
        let yaml = "pois:\n  - { key: bad, lat: 91.0, lng: 0.0 }\n";
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_watch_timeout_duration() {
        let config = MonitorConfig::default();
        assert_eq!(config.watch_timeout(), Duration::from_secs(10));
    }
}
