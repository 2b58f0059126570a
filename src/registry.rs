use crate::config::SensorConfig;
use crate::errors::{RegistryError, RegistryResult, SessionError, SessionResult};
use crate::lookup::{Lookup, StandardTables};
use crate::measurement::{Endpoint, MeasurementType};
use crate::session::Session;
use crate::slot::SampleSlot;
use crate::sources::{create_source, SampleSource};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

type SensorSlots = [Arc<SampleSlot>; 3];

/// Description of one openable endpoint
#[derive(Debug, Clone, Serialize)]
pub struct EndpointInfo {
    pub name: String,
    pub minor: u32,
    pub sensor_id: String,
}

/// Maps endpoints to their slots. Built once at startup and only read afterwards.
pub struct DeviceTable {
    sensors: BTreeMap<u32, (String, SensorSlots)>,
    lookup: Arc<dyn Lookup>,
}

impl DeviceTable {
    pub fn from_config(config: &SensorConfig) -> Self {
        Self::with_lookup(config, Arc::new(StandardTables::new()))
    }

    pub fn with_lookup(config: &SensorConfig, lookup: Arc<dyn Lookup>) -> Self {
        let sensors = config
            .sensors
            .iter()
            .map(|s| {
                let slots = MeasurementType::ALL
                    .map(|kind| Arc::new(SampleSlot::new(Endpoint::new(s.index, kind))));
                info!("[registry] sensor{} ({}) driver={}", s.index, s.id, s.driver);
                (s.index, (s.id.clone(), slots))
            })
            .collect();
        Self { sensors, lookup }
    }

    /// Slot backing `endpoint`, for producers and views
    pub fn slot(&self, endpoint: Endpoint) -> SessionResult<Arc<SampleSlot>> {
        self.sensors
            .get(&endpoint.sensor)
            .map(|(_, slots)| Arc::clone(&slots[endpoint.kind.index()]))
            .ok_or_else(|| SessionError::no_such_device(endpoint.to_string()))
    }

    pub fn open(&self, endpoint: Endpoint) -> SessionResult<Session> {
        let slot = self.slot(endpoint)?;
        Ok(Session::new(slot, Arc::clone(&self.lookup)))
    }

    pub fn open_minor(&self, minor: u32) -> SessionResult<Session> {
        self.open(Endpoint::from_minor(minor)?)
    }

    /// Open by device node name, e.g. `sensor0-temp`
    pub fn open_path(&self, name: &str) -> SessionResult<Session> {
        self.open(name.parse()?)
    }

    pub fn sensor_count(&self) -> usize {
        self.sensors.len()
    }

    pub fn endpoints(&self) -> Vec<EndpointInfo> {
        self.sensors
            .iter()
            .flat_map(|(index, (id, _))| {
                MeasurementType::ALL.iter().map(move |&kind| {
                    let ep = Endpoint::new(*index, kind);
                    EndpointInfo {
                        name: ep.to_string(),
                        minor: ep.minor(),
                        sensor_id: id.clone(),
                    }
                })
            })
            .collect()
    }

    /// Endpoint listing for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.endpoints())
    }
}

/// Build the device table and one sample source per configured sensor
pub fn init_all(
    config: &SensorConfig,
) -> RegistryResult<(Arc<DeviceTable>, Vec<(u32, Box<dyn SampleSource>)>)> {
    let mut sources = Vec::with_capacity(config.sensors.len());
    for s in config.sensors.iter() {
        let source = create_source(&s.driver, s.id.clone(), s.codes)
            .map_err(RegistryError::SourceCreationError)?;
        sources.push((s.index, source));
    }
    Ok((Arc::new(DeviceTable::from_config(config)), sources))
}
