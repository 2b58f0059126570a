use crate::config::SensorConfig;
use crate::measurement::{Endpoint, MeasurementType};
use crate::registry::DeviceTable;
use crate::sources::SampleSource;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};
use tracing::{debug, error, info, warn};

/// Spawn one producer task per sensor. Each task polls its source at the
/// configured frequency and publishes every code into the matching slot.
pub fn spawn_producers(
    table: Arc<DeviceTable>,
    sources: Vec<(u32, Box<dyn SampleSource>)>,
    sensor_config: &SensorConfig,
) -> Vec<JoinHandle<()>> {
    let mut handles = Vec::with_capacity(sources.len());

    for (index, mut source) in sources.into_iter() {
        let frequency = sensor_config
            .sensors
            .iter()
            .find(|s| s.index == index)
            .map(|s| s.frequency_hz())
            .unwrap_or(1);
        let period = Duration::from_millis(u64::from(1000 / frequency.max(1)).max(1));

        let slots = match MeasurementType::ALL
            .iter()
            .map(|&kind| table.slot(Endpoint::new(index, kind)).map(|slot| (kind, slot)))
            .collect::<Result<Vec<_>, _>>()
        {
            Ok(slots) => slots,
            Err(e) => {
                error!("[{}] no slots for sensor{}: {}", source.id(), index, e);
                continue;
            }
        };

        handles.push(tokio::spawn(async move {
            info!("[{}] Starting producer for sensor{} at {}Hz", source.id(), index, frequency);

            loop {
                match source.acquire().await {
                    Ok(reading) => {
                        for (kind, slot) in &slots {
                            slot.publish(reading.code(*kind));
                        }
                        debug!("[{}] published {:?}", source.id(), reading);
                    }
                    Err(e) => {
                        warn!("[{}] acquisition failed: {}", source.id(), e);
                    }
                }

                sleep(period).await;
            }
        }));
    }

    handles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{SourceError, SourceResult};
    use crate::sources::RawReading;
    use async_trait::async_trait;

    /// Fails every other acquisition
    struct Flaky {
        calls: u16,
    }

    #[async_trait]
    impl SampleSource for Flaky {
        async fn acquire(&mut self) -> SourceResult<RawReading> {
            self.calls += 1;
            if self.calls % 2 == 0 {
                return Err(SourceError::AcquireError {
                    sensor: "flaky".into(),
                    reason: "radio timeout".into(),
                });
            }
            Ok(RawReading { battery: self.calls, temperature: 2, light: 3 })
        }

        fn id(&self) -> &str {
            "flaky"
        }
    }

    #[tokio::test]
    async fn test_producer_feeds_sessions_and_survives_errors() {
        let cfg = SensorConfig::parse(
            "[[sensor]]\nindex = 4\nid = \"flaky\"\ndriver = \"simulated\"\nfrequency = 100\n",
        )
        .unwrap();
        let table = Arc::new(DeviceTable::from_config(&cfg));
        let session = table.open_path("sensor4-batt").unwrap();
        session.set_mode(crate::session::Mode::Raw).await.unwrap();

        let handles = spawn_producers(table.clone(), vec![(4, Box::new(Flaky { calls: 0 }) as Box<dyn SampleSource>)], &cfg);
        assert_eq!(handles.len(), 1);

        let mut seen = Vec::new();
        for _ in 0..3 {
            let mut out = Vec::new();
            let n = tokio::time::timeout(Duration::from_secs(2), session.read(0, 2, &mut out, false))
                .await
                .expect("producer stalled")
                .unwrap();
            assert_eq!(n, 2);
            seen.push(u16::from_be_bytes([out[0], out[1]]));
        }
        // only odd calls succeed, and each record is newer than the last
        assert!(seen.iter().all(|code| code % 2 == 1));
        assert!(seen.windows(2).all(|w| w[0] < w[1]));

        for h in handles {
            h.abort();
        }
    }

    #[tokio::test]
    async fn test_unknown_sensor_index_is_skipped() {
        let cfg = SensorConfig::parse("[[sensor]]\nindex = 0\nid = \"a\"\ndriver = \"simulated\"\n")
            .unwrap();
        let table = Arc::new(DeviceTable::from_config(&cfg));
        let handles = spawn_producers(table, vec![(7, Box::new(Flaky { calls: 0 }) as Box<dyn SampleSource>)], &cfg);
        assert!(handles.is_empty());
    }
}
