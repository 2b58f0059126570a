use crate::errors::{ConfigError, ConfigResult};
use crate::measurement::MAX_SENSOR_INDEX;
use crate::session::Mode;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;

/// Polling rate used when a sensor entry does not set one
pub const DEFAULT_FREQUENCY_HZ: u32 = 1;

/// Root configuration struct expecting `[[sensor]]` and `[[watch]]` TOML arrays
#[derive(Debug, Deserialize)]
pub struct SensorConfig {
    #[serde(rename = "sensor")]
    pub sensors: Vec<SensorEntry>,
    #[serde(rename = "watch", default)]
    pub watches: Vec<WatchEntry>,
}

/// One sensor entry, matching each `[[sensor]]` section
#[derive(Debug, Deserialize)]
pub struct SensorEntry {
    /// Sensor number used in device names and minor numbers
    pub index: u32,
    pub id: String,
    pub driver: String,
    pub frequency: Option<u32>,
    /// Battery, temperature and light codes for the `fixed` driver
    pub codes: Option<[u16; 3]>,
}

impl SensorEntry {
    pub fn frequency_hz(&self) -> u32 {
        self.frequency.unwrap_or(DEFAULT_FREQUENCY_HZ)
    }
}

/// An endpoint the hub binary opens and logs
#[derive(Debug, Deserialize)]
pub struct WatchEntry {
    pub device: String,
    #[serde(default)]
    pub mode: Mode,
}

impl SensorConfig {
    pub fn parse(content: &str) -> ConfigResult<Self> {
        let parsed: SensorConfig = toml::from_str(content)?;
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for s in &self.sensors {
            if s.index > MAX_SENSOR_INDEX {
                return Err(ConfigError::InvalidValue {
                    field: format!("sensor.{}.index", s.id),
                    reason: format!("{} exceeds {}", s.index, MAX_SENSOR_INDEX),
                });
            }
            if !seen.insert(s.index) {
                return Err(ConfigError::ValidationError(format!(
                    "sensor index {} is used more than once",
                    s.index
                )));
            }
            if s.frequency == Some(0) {
                return Err(ConfigError::InvalidValue {
                    field: format!("sensor.{}.frequency", s.id),
                    reason: "must be at least 1 Hz".to_string(),
                });
            }
            if s.driver == "fixed" && s.codes.is_none() {
                return Err(ConfigError::InvalidValue {
                    field: format!("sensor.{}.codes", s.id),
                    reason: "the fixed driver needs codes = [batt, temp, light]".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Loads config from TOML file
pub fn load_sensor_config(path: &str) -> ConfigResult<SensorConfig> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::LoadError {
        path: path.to_string(),
        source,
    })?;
    SensorConfig::parse(&content)
}
