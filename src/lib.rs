// Public modules
pub mod config;
pub mod errors;
pub mod file;
pub mod lookup;
pub mod measurement;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod session;
pub mod slot;
pub mod sources;

// Re-export commonly used types
pub use config::{load_sensor_config, SensorConfig};
pub use errors::{SessionError, SessionResult};
pub use file::SensorFile;
pub use measurement::{Endpoint, MeasurementType};
pub use registry::{init_all, DeviceTable};
pub use scheduler::spawn_producers;
pub use session::{Mode, Session};

use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

/// Initialize tracing with default configuration
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

/// Run the hub with the given configuration directory until Ctrl-C
pub async fn run_sensor_hub(config_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    info!("[SensorHubSessions] starting up...");

    let sensor_config_path = format!("{}/sensors.toml", config_path);
    let sensor_config = load_sensor_config(&sensor_config_path)?;
    info!("[config] loaded {} sensor(s)", sensor_config.sensors.len());

    let (table, sources) = init_all(&sensor_config)?;
    info!("[registry] {} sensor(s), {} endpoint(s)", table.sensor_count(), table.endpoints().len());
    debug!("[registry] endpoints: {}", table.to_json()?);

    let mut tasks = spawn_producers(table.clone(), sources, &sensor_config);
    info!("[main] producer tasks launched");

    for watch in sensor_config.watches.iter() {
        let session = match table.open_path(&watch.device) {
            Ok(session) => session,
            Err(e) => {
                warn!("[watch] cannot open {}: {}", watch.device, e);
                continue;
            }
        };
        session.set_mode(watch.mode).await?;
        let mut file = SensorFile::new(session);

        tasks.push(tokio::spawn(async move {
            info!("[watch] reading {} ({:?})", file.endpoint(), file.mode().await);
            loop {
                match file.read_record().await {
                    Ok(record) => info!("[{}] {}", file.endpoint(), describe_record(&record)),
                    Err(e) if e.is_retryable() => continue,
                    Err(e) => {
                        error!("[{}] read failed: {}", file.endpoint(), e);
                        break;
                    }
                }
            }
        }));
    }

    info!("[main] Ready, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("[main] shutting down");
    for task in tasks {
        task.abort();
    }
    Ok(())
}

/// Formatted records are logged as text, raw records as the decoded code
fn describe_record(record: &[u8]) -> String {
    match record {
        [hi, lo] => format!("raw {}", u16::from_be_bytes([*hi, *lo])),
        text => String::from_utf8_lossy(text).trim_end().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_record() {
        assert_eq!(describe_record(&[0x01, 0x2C]), "raw 300");
        assert_eq!(describe_record(b"-12.34    "), "-12.34");
    }
}
