use crate::errors::{SessionError, SessionResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of low minor-number bits reserved for the measurement type
pub const TYPE_BITS: u32 = 3;
const TYPE_MASK: u32 = (1 << TYPE_BITS) - 1;

/// Highest sensor index that still fits a 32-bit minor number
pub const MAX_SENSOR_INDEX: u32 = u32::MAX >> TYPE_BITS;

/// The three quantities every sensor reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Battery,
    Temperature,
    Light,
}

impl MeasurementType {
    pub const ALL: [MeasurementType; 3] = [
        MeasurementType::Battery,
        MeasurementType::Temperature,
        MeasurementType::Light,
    ];

    pub fn code(self) -> u32 {
        match self {
            MeasurementType::Battery => 0,
            MeasurementType::Temperature => 1,
            MeasurementType::Light => 2,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(MeasurementType::Battery),
            1 => Some(MeasurementType::Temperature),
            2 => Some(MeasurementType::Light),
            _ => None,
        }
    }

    /// Short name used in device node names
    pub fn name(self) -> &'static str {
        match self {
            MeasurementType::Battery => "batt",
            MeasurementType::Temperature => "temp",
            MeasurementType::Light => "light",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        match s {
            "batt" => Some(MeasurementType::Battery),
            "temp" => Some(MeasurementType::Temperature),
            "light" => Some(MeasurementType::Light),
            _ => None,
        }
    }

    /// Position of this type inside a per-sensor slot array
    pub(crate) fn index(self) -> usize {
        self.code() as usize
    }
}

/// A (sensor, measurement type) pair a session can be opened on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub sensor: u32,
    pub kind: MeasurementType,
}

impl Endpoint {
    pub fn new(sensor: u32, kind: MeasurementType) -> Self {
        Self { sensor, kind }
    }

    /// Decode `sensor << 3 | type`
    pub fn from_minor(minor: u32) -> SessionResult<Self> {
        let kind = MeasurementType::from_code(minor & TYPE_MASK)
            .ok_or_else(|| SessionError::no_such_device(format!("minor {}", minor)))?;
        Ok(Self { sensor: minor >> TYPE_BITS, kind })
    }

    pub fn minor(&self) -> u32 {
        (self.sensor << TYPE_BITS) | self.kind.code()
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sensor{}-{}", self.sensor, self.kind.name())
    }
}

impl FromStr for Endpoint {
    type Err = SessionError;

    /// Parses device node names such as `sensor0-temp` or `/dev/sensor12-batt`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || SessionError::no_such_device(s);
        let name = s.rsplit('/').next().unwrap_or(s);
        let rest = name.strip_prefix("sensor").ok_or_else(bad)?;
        let (index, kind) = rest.split_once('-').ok_or_else(bad)?;
        let sensor: u32 = index.parse().map_err(|_| bad())?;
        if sensor > MAX_SENSOR_INDEX {
            return Err(bad());
        }
        let kind = MeasurementType::from_name(kind).ok_or_else(bad)?;
        Ok(Self { sensor, kind })
    }
}
