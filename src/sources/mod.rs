use crate::errors::{SourceError, SourceResult};
use crate::lookup::RAW_MAX;
use crate::measurement::MeasurementType;
use async_trait::async_trait;

pub mod fixed;
#[cfg(feature = "simulated")]
pub mod simulated;

/// One acquisition: a raw code for every measurement type of a sensor
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RawReading {
    pub battery: u16,
    pub temperature: u16,
    pub light: u16,
}

impl RawReading {
    pub fn code(&self, kind: MeasurementType) -> u16 {
        match kind {
            MeasurementType::Battery => self.battery,
            MeasurementType::Temperature => self.temperature,
            MeasurementType::Light => self.light,
        }
    }
}

/// Producer side of a sensor: yields raw readings on demand
#[async_trait]
pub trait SampleSource: Send {
    async fn acquire(&mut self) -> SourceResult<RawReading>;
    fn id(&self) -> &str;
}

pub fn create_source(
    driver: &str,
    id: String,
    codes: Option<[u16; 3]>,
) -> SourceResult<Box<dyn SampleSource>> {
    match driver {
        #[cfg(feature = "simulated")]
        "simulated" => Ok(Box::new(simulated::SimulatedSource::new(id))),
        "fixed" => {
            let codes = codes.ok_or_else(|| SourceError::ConfigError {
                sensor: id.clone(),
                reason: "fixed driver without codes".to_string(),
            })?;
            for (kind, code) in MeasurementType::ALL.iter().zip(codes) {
                if code > RAW_MAX {
                    return Err(SourceError::CodeOutOfRange { sensor: id, kind: kind.name(), code });
                }
            }
            Ok(Box::new(fixed::FixedSource::new(id, codes)))
        }
        _ => Err(SourceError::UnsupportedDriver { driver: driver.to_string() }),
    }
}
