//! Configuration file management for skywatch.
//!
//! Reads/writes `~/.skywatch/config.yaml` with the observer location,
//! tracking radius, OpenSky account name, and reference data paths.
//! The OpenSky password is never stored here.

use std::path::PathBuf;

use crate::session::{ArrivalPolicy, TrackerConfig};
use crate::types::{Coordinate, Result, SkywatchError};

/// Observer used when no coordinates are configured and geocoding fails.
pub const DEFAULT_OBSERVER: Coordinate = Coordinate::new(42.4678732, -71.0249055);

pub const DEFAULT_OPENSKY_URL: &str = "https://opensky-network.org/api";

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub observer: ObserverConfig,
    pub tracking: TrackingConfig,
    pub opensky: OpenSkyConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObserverConfig {
    pub address: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    /// IANA zone name; resolved from the coordinate when absent.
    pub timezone: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    pub radius_miles: f64,
    pub refresh_seconds: u64,
    pub arrival_policy: ArrivalPolicy,
    pub metadata_cache_capacity: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenSkyConfig {
    pub username: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    pub aircraft_types: Option<String>,
    pub airlines: Option<String>,
    pub missing_log: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            observer: ObserverConfig {
                address: None,
                lat: None,
                lon: None,
                timezone: None,
            },
            tracking: TrackingConfig {
                radius_miles: 25.0,
                refresh_seconds: 10,
                arrival_policy: ArrivalPolicy::EverSeen,
                metadata_cache_capacity: 4096,
            },
            opensky: OpenSkyConfig {
                username: None,
                base_url: DEFAULT_OPENSKY_URL.into(),
            },
            data: DataConfig {
                aircraft_types: Some("aircraft_types.json".into()),
                airlines: Some("airlines_full.json".into()),
                missing_log: "missing_aircraft.log".into(),
            },
        }
    }
}

impl Config {
    /// Observer coordinate from the file, if both axes are set and valid.
    pub fn observer_coordinate(&self) -> Option<Coordinate> {
        match (self.observer.lat, self.observer.lon) {
            (Some(lat), Some(lon)) => Coordinate::checked(lat, lon).ok(),
            _ => None,
        }
    }

    /// Freeze the tracking settings for a session around `observer`.
    pub fn tracker_config(&self, observer: Coordinate) -> Result<TrackerConfig> {
        Ok(TrackerConfig::new(observer, self.tracking.radius_miles)?
            .with_arrival_policy(self.tracking.arrival_policy))
    }
}

/// Get the config directory path (`~/.skywatch/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".skywatch")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `path`, or `~/.skywatch/config.yaml` when `None`.
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config(path: Option<&std::path::Path>) -> Config {
    let path = path.map(PathBuf::from).unwrap_or_else(config_file);
    if !path.exists() {
        return Config::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(text) => parse_config(&text),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "config unreadable, using defaults");
            Config::default()
        }
    }
}

/// Save config to `path`, or `~/.skywatch/config.yaml` when `None`.
pub fn save_config(config: &Config, path: Option<&std::path::Path>) -> Result<PathBuf> {
    let path = path.map(PathBuf::from).unwrap_or_else(config_file);
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| SkywatchError::Config(e.to_string()))?;
    }
    std::fs::write(&path, serialize_config(config))
        .map_err(|e| SkywatchError::Config(e.to_string()))?;
    Ok(path)
}

/// Parse simple YAML-like config text. Unknown keys and bad values are
/// ignored, leaving the default in place.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let stripped = line.trim();
        if stripped.is_empty() || stripped.starts_with('#') {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        let Some(section) = current_section.as_deref() else {
            continue;
        };
        match (section, key) {
            ("observer", "address") => config.observer.address = parse_string_value(val),
            ("observer", "lat") => config.observer.lat = parse_float_value(val),
            ("observer", "lon") => config.observer.lon = parse_float_value(val),
            ("observer", "timezone") => config.observer.timezone = parse_string_value(val),
            ("tracking", "radius_miles") => {
                if let Some(v) = parse_float_value(val).filter(|r| *r > 0.0) {
                    config.tracking.radius_miles = v;
                }
            }
            ("tracking", "refresh_seconds") => {
                if let Some(v) = val.parse::<u64>().ok().filter(|s| *s > 0) {
                    config.tracking.refresh_seconds = v;
                }
            }
            ("tracking", "arrival_policy") => {
                if let Some(v) = parse_string_value(val).and_then(|s| s.parse().ok()) {
                    config.tracking.arrival_policy = v;
                }
            }
            ("tracking", "metadata_cache_capacity") => {
                if let Ok(v) = val.parse::<usize>() {
                    config.tracking.metadata_cache_capacity = v;
                }
            }
            ("opensky", "username") => config.opensky.username = parse_string_value(val),
            ("opensky", "base_url") => {
                if let Some(v) = parse_string_value(val) {
                    config.opensky.base_url = v;
                }
            }
            ("data", "aircraft_types") => config.data.aircraft_types = parse_string_value(val),
            ("data", "airlines") => config.data.airlines = parse_string_value(val),
            ("data", "missing_log") => {
                if let Some(v) = parse_string_value(val) {
                    config.data.missing_log = v;
                }
            }
            _ => {}
        }
    }

    config
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok().filter(|v: &f64| v.is_finite())
}

fn opt_string(v: &Option<String>) -> String {
    match v {
        Some(s) => format!("\"{s}\""),
        None => "null".into(),
    }
}

fn opt_float(v: Option<f64>) -> String {
    match v {
        Some(x) => x.to_string(),
        None => "null".into(),
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# skywatch configuration".to_string(), String::new()];

    lines.push("observer:".into());
    lines.push(format!("  address: {}", opt_string(&config.observer.address)));
    lines.push(format!("  lat: {}", opt_float(config.observer.lat)));
    lines.push(format!("  lon: {}", opt_float(config.observer.lon)));
    lines.push(format!("  timezone: {}", opt_string(&config.observer.timezone)));
    lines.push(String::new());

    lines.push("tracking:".into());
    lines.push(format!("  radius_miles: {}", config.tracking.radius_miles));
    lines.push(format!("  refresh_seconds: {}", config.tracking.refresh_seconds));
    lines.push(format!("  arrival_policy: {}", config.tracking.arrival_policy));
    lines.push(format!(
        "  metadata_cache_capacity: {}",
        config.tracking.metadata_cache_capacity
    ));
    lines.push(String::new());

    lines.push("opensky:".into());
    lines.push(format!("  username: {}", opt_string(&config.opensky.username)));
    lines.push(format!("  base_url: \"{}\"", config.opensky.base_url));
    lines.push(String::new());

    lines.push("data:".into());
    lines.push(format!(
        "  aircraft_types: {}",
        opt_string(&config.data.aircraft_types)
    ));
    lines.push(format!("  airlines: {}", opt_string(&config.data.airlines)));
    lines.push(format!("  missing_log: \"{}\"", config.data.missing_log));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.tracking.radius_miles, 25.0);
        assert_eq!(config.tracking.refresh_seconds, 10);
        assert_eq!(config.opensky.base_url, DEFAULT_OPENSKY_URL);
        assert!(config.observer_coordinate().is_none());
    }

    #[test]
    fn test_parse_config() {
        let text = r#"
observer:
  address: "948 Broadway, Saugus MA"
  lat: 42.46
  lon: -71.02
  timezone: America/New_York

tracking:
  radius_miles: 40
  refresh_seconds: 15
  arrival_policy: continuous
  metadata_cache_capacity: 128

opensky:
  username: "spotter"

data:
  airlines: "/tmp/airlines.json"
  aircraft_types: null
"#;
        let config = parse_config(text);
        assert_eq!(
            config.observer.address.as_deref(),
            Some("948 Broadway, Saugus MA")
        );
        assert_eq!(
            config.observer_coordinate(),
            Some(Coordinate::new(42.46, -71.02))
        );
        assert_eq!(config.observer.timezone.as_deref(), Some("America/New_York"));
        assert_eq!(config.tracking.radius_miles, 40.0);
        assert_eq!(config.tracking.refresh_seconds, 15);
        assert_eq!(config.tracking.arrival_policy, ArrivalPolicy::Continuous);
        assert_eq!(config.tracking.metadata_cache_capacity, 128);
        assert_eq!(config.opensky.username.as_deref(), Some("spotter"));
        assert_eq!(config.data.airlines.as_deref(), Some("/tmp/airlines.json"));
        assert!(config.data.aircraft_types.is_none());
        assert_eq!(config.data.missing_log, "missing_aircraft.log");
    }

    #[test]
    fn test_parse_config_bad_values_keep_defaults() {
        let text = r#"
tracking:
  radius_miles: -3
  refresh_seconds: soon
  arrival_policy: sometimes
observer:
  lat: 123.0
  lon: 10.0
"#;
        let config = parse_config(text);
        assert_eq!(config.tracking.radius_miles, 25.0);
        assert_eq!(config.tracking.refresh_seconds, 10);
        assert_eq!(config.tracking.arrival_policy, ArrivalPolicy::EverSeen);
        assert!(config.observer_coordinate().is_none());
    }

    #[test]
    fn test_tracker_config() {
        let config = Config::default();
        let tc = config.tracker_config(DEFAULT_OBSERVER).unwrap();
        assert_eq!(tc.radius_mi, 25.0);
        assert_eq!(tc.observer, DEFAULT_OBSERVER);
    }

    #[test]
    fn test_roundtrip() {
        let mut config = Config::default();
        config.observer.address = Some("Saugus, MA".into());
        config.observer.lat = Some(42.4678732);
        config.observer.lon = Some(-71.0249055);
        config.tracking.radius_miles = 12.5;
        config.tracking.arrival_policy = ArrivalPolicy::Continuous;
        config.opensky.username = Some("spotter".into());

        let parsed = parse_config(&serialize_config(&config));
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let mut config = Config::default();
        config.tracking.radius_miles = 7.0;

        let written = save_config(&config, Some(&path)).unwrap();
        assert_eq!(written, path);
        assert_eq!(load_config(Some(&path)), config);
    }

    #[test]
    fn test_load_missing_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.yaml")));
        assert_eq!(config, Config::default());
    }
}
