pub mod sensor_config;

pub use sensor_config::{load_sensor_config, SensorConfig, SensorEntry, WatchEntry};
