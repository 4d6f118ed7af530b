//! # Configuration Management
//!
//! Configuration comes from `weather-config.toml` and the environment. The
//! file is optional and every section falls back to defaults, so a file that
//! only sets `[location]` is valid. Environment variables (also read from a
//! `.env` file by the binary) override the file:
//!
//! | variable | field |
//! |---|---|
//! | `CITY` | `location.city` |
//! | `COUNTRYCODE` | `location.country_code` |
//! | `WARNING_TEMP` | `weather.warning_temp` |
//! | `ADMIRALTY_API_KEY` | `tides.api_key` |
//! | `ADMIRALTY_API_STATION_ID` | `tides.station_id` |
//! | `ADMIRALTY_API_HIGH_TIDE_CORRECTION` | `tides.high_correction_minutes` |
//! | `ADMIRALTY_API_LOW_TIDE_CORRECTION` | `tides.low_correction_minutes` |
//!
//! The result is read once at startup and passed by reference from then on.

use crate::display::{DisplayError, Resolution};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default configuration file name.
pub const CONFIG_FILE: &str = "weather-config.toml";

/// Application configuration loaded from weather-config.toml
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Place to forecast
    pub location: LocationConfig,
    /// Forecast source and temperature warning
    pub weather: WeatherConfig,
    /// Admiralty tide feed
    pub tides: TideConfig,
    /// Panel size, icons and wiring
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LocationConfig {
    pub city: String,
    /// ISO 3166 country code, e.g. "GB"
    pub country_code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Temperatures at or above this are drawn in red
    pub warning_temp: f64,
    /// ArcGIS findAddressCandidates endpoint
    pub geocoder_url: String,
    /// Forecast page base; coordinates, units and language are appended
    pub forecast_url: String,
    pub units: String,
    pub language: String,
    /// Reuse a previously cached forecast page instead of fetching
    pub use_cache: bool,
    /// Directory holding cached forecast pages
    pub cache_dir: String,
    /// Per-request HTTP timeout
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TideConfig {
    /// Admiralty API subscription key; tides are skipped when empty
    pub api_key: String,
    /// Admiralty station ID (e.g. "0113" for London Bridge)
    pub station_id: String,
    pub api_url: String,
    /// Days of events to request
    pub duration_days: u32,
    /// Minutes added to high water times for a nearby secondary port
    pub high_correction_minutes: i64,
    /// Minutes added to low water times
    pub low_correction_minutes: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Panel width in pixels (212 or 250)
    pub width: u32,
    /// Panel height in pixels (104 or 122)
    pub height: u32,
    /// Directory containing icon-<category>.png files
    pub resources_dir: String,
    /// Wiring for the SPI panel
    pub hardware: HardwareConfig,
}

/// GPIO/SPI wiring, BCM numbering
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HardwareConfig {
    pub dc_pin: u32,
    pub rst_pin: u32,
    pub busy_pin: u32,
    pub spi_device: String,
    pub gpio_chip: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        LocationConfig {
            city: "London".to_string(),
            country_code: "GB".to_string(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        WeatherConfig {
            warning_temp: 25.0,
            geocoder_url: "https://geocode.arcgis.com/arcgis/rest/services/World/GeocodeServer/findAddressCandidates".to_string(),
            forecast_url: "https://darksky.net/forecast".to_string(),
            units: "uk212".to_string(),
            language: "en".to_string(),
            use_cache: false,
            cache_dir: ".".to_string(),
            timeout_secs: 10,
        }
    }
}

impl Default for TideConfig {
    fn default() -> Self {
        TideConfig {
            api_key: String::new(),
            station_id: "0113".to_string(),
            api_url: "https://admiraltyapi.azure-api.net/uktidalapi/api/V1".to_string(),
            duration_days: 2,
            high_correction_minutes: 0,
            low_correction_minutes: 0,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            width: 212,
            height: 104,
            resources_dir: "resources".to_string(),
            hardware: HardwareConfig::default(),
        }
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        HardwareConfig {
            dc_pin: 25,
            rst_pin: 17,
            busy_pin: 24,
            spi_device: "/dev/spidev0.0".to_string(),
            gpio_chip: "/dev/gpiochip0".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from weather-config.toml
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load() -> Self {
        Self::load_from_path(CONFIG_FILE)
    }

    /// Load configuration from specified path
    /// Falls back to default configuration if file doesn't exist or is invalid
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(mut config) => {
                    config.keep_finite_warning_temp(WeatherConfig::default().warning_temp);
                    log::info!(
                        "Loaded configuration for {}",
                        config.location_string()
                    );
                    config
                }
                Err(e) => {
                    log::warn!("Invalid config file format: {}", e);
                    log::warn!("Using default configuration (London, GB)");
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("No config file found, using default configuration");
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(mut self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok());
        self
    }

    /// Apply overrides from any key lookup. Numeric values that fail to parse
    /// are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(city) = lookup("CITY") {
            self.location.city = city;
        }
        if let Some(code) = lookup("COUNTRYCODE") {
            self.location.country_code = code;
        }
        let warning_temp = self.weather.warning_temp;
        override_parsed(&lookup, "WARNING_TEMP", &mut self.weather.warning_temp);
        self.keep_finite_warning_temp(warning_temp);
        if let Some(key) = lookup("ADMIRALTY_API_KEY") {
            self.tides.api_key = key;
        }
        if let Some(station) = lookup("ADMIRALTY_API_STATION_ID") {
            self.tides.station_id = station;
        }
        override_parsed(
            &lookup,
            "ADMIRALTY_API_HIGH_TIDE_CORRECTION",
            &mut self.tides.high_correction_minutes,
        );
        override_parsed(
            &lookup,
            "ADMIRALTY_API_LOW_TIDE_CORRECTION",
            &mut self.tides.low_correction_minutes,
        );
    }

    /// Replace a NaN or infinite threshold with `fallback`.
    fn keep_finite_warning_temp(&mut self, fallback: f64) {
        if !self.weather.warning_temp.is_finite() {
            log::warn!(
                "Ignoring warning_temp {}: not a finite number",
                self.weather.warning_temp
            );
            self.weather.warning_temp = fallback;
        }
    }

    /// "City, CC", used for geocoding and as the cache key.
    pub fn location_string(&self) -> String {
        format!("{}, {}", self.location.city, self.location.country_code)
    }

    /// Validated panel resolution.
    pub fn resolution(&self) -> Result<Resolution, DisplayError> {
        Resolution::try_from((self.display.width, self.display.height))
    }

    /// Write the current configuration to `path` as TOML.
    pub fn save_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(&path, contents)?;
        log::info!("Configuration saved to {}", path.as_ref().display());
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse() {
            Ok(value) => *target = value,
            Err(_) => log::warn!("Ignoring {}={:?}: not a valid number", key, raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.location.city, "London");
        assert_eq!(config.location.country_code, "GB");
        assert_eq!(config.weather.warning_temp, 25.0);
        assert!(!config.weather.use_cache);
        assert_eq!(config.tides.station_id, "0113");
        assert_eq!(config.tides.high_correction_minutes, 0);
        assert_eq!(config.tides.low_correction_minutes, 0);
        assert!(config.tides.api_key.is_empty());
        assert_eq!(config.location_string(), "London, GB");
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.location.city, parsed.location.city);
        assert_eq!(config.display.width, parsed.display.width);
        assert_eq!(config.display.hardware.busy_pin, parsed.display.hardware.busy_pin);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let parsed: Config = toml::from_str(
            r#"
[location]
city = "Oban"

[display]
width = 250
height = 122
"#,
        )
        .unwrap();
        assert_eq!(parsed.location.city, "Oban");
        assert_eq!(parsed.location.country_code, "GB");
        assert_eq!(parsed.weather.warning_temp, 25.0);
        assert_eq!(parsed.resolution().unwrap(), Resolution::Phat250x122);
    }

    #[test]
    fn test_load_nonexistent_file() {
        let config = Config::load_from_path("/nonexistent/path");
        // Should fallback to default
        assert_eq!(config.location.city, "London");
    }

    #[test]
    fn test_load_invalid_file_falls_back() {
        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "location = [not toml").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.location.city, "London");
    }

    #[test]
    fn test_save_and_reload() {
        let file = NamedTempFile::new().unwrap();
        let mut config = Config::default();
        config.location.city = "Whitby".to_string();
        config.save_to_path(file.path()).unwrap();

        let reloaded = Config::load_from_path(file.path());
        assert_eq!(reloaded.location.city, "Whitby");
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("CITY", "Plymouth"),
            ("COUNTRYCODE", "UK"),
            ("WARNING_TEMP", "22.5"),
            ("ADMIRALTY_API_KEY", "secret"),
            ("ADMIRALTY_API_STATION_ID", "0014"),
            ("ADMIRALTY_API_HIGH_TIDE_CORRECTION", "-12"),
            ("ADMIRALTY_API_LOW_TIDE_CORRECTION", " 7 "),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.location_string(), "Plymouth, UK");
        assert_eq!(config.weather.warning_temp, 22.5);
        assert_eq!(config.tides.api_key, "secret");
        assert_eq!(config.tides.station_id, "0014");
        assert_eq!(config.tides.high_correction_minutes, -12);
        assert_eq!(config.tides.low_correction_minutes, 7);
    }

    #[test]
    fn test_invalid_numeric_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| match key {
            "WARNING_TEMP" => Some("hot".to_string()),
            "ADMIRALTY_API_HIGH_TIDE_CORRECTION" => Some("1.5".to_string()),
            _ => None,
        });
        assert_eq!(config.weather.warning_temp, 25.0);
        assert_eq!(config.tides.high_correction_minutes, 0);
    }

    #[test]
    fn test_non_finite_warning_temp_is_rejected() {
        for raw in ["nan", "NaN", "inf", "-inf"] {
            let mut config = Config::default();
            config.apply_overrides(|key| (key == "WARNING_TEMP").then(|| raw.to_string()));
            assert_eq!(config.weather.warning_temp, 25.0, "WARNING_TEMP={raw}");
        }

        let file = NamedTempFile::new().unwrap();
        fs::write(file.path(), "[weather]\nwarning_temp = nan\n").unwrap();
        let config = Config::load_from_path(file.path());
        assert_eq!(config.weather.warning_temp, 25.0);
    }

    #[test]
    fn test_unsupported_resolution_in_config() {
        let mut config = Config::default();
        config.display.width = 300;
        config.display.height = 200;
        assert!(matches!(
            config.resolution(),
            Err(DisplayError::UnsupportedResolution { width: 300, height: 200 })
        ));
    }
}
