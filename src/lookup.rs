//! Raw-code to physical-value conversion
//!
//! Sensors report 10-bit ADC codes. Converting a code into a physical value is
//! a pure function per measurement type; the standard tables precompute every
//! code once so the read path only does an index.
//!
//! Values are signed fixed point with [`FRACTION_DIGITS`] implied decimal
//! places, i.e. `-1234` means `-12.34`.

use crate::measurement::MeasurementType;

/// Implied decimal places of every looked-up value
pub const FRACTION_DIGITS: u32 = 2;

/// Highest code a sensor produces (10-bit ADC)
pub const RAW_MAX: u16 = 1023;

const TABLE_LEN: usize = RAW_MAX as usize + 1;

/// Maps a raw code to a fixed-point physical value
pub trait Lookup: Send + Sync {
    fn physical(&self, kind: MeasurementType, raw: u16) -> i32;
}

/// Precomputed tables covering the full 10-bit code range
pub struct StandardTables {
    battery: Box<[i32]>,
    temperature: Box<[i32]>,
    light: Box<[i32]>,
}

impl StandardTables {
    pub fn new() -> Self {
        Self {
            battery: build_table(battery_centivolts),
            temperature: build_table(temperature_centidegrees),
            light: build_table(light_centiunits),
        }
    }

    fn table(&self, kind: MeasurementType) -> &[i32] {
        match kind {
            MeasurementType::Battery => &self.battery,
            MeasurementType::Temperature => &self.temperature,
            MeasurementType::Light => &self.light,
        }
    }
}

impl Default for StandardTables {
    fn default() -> Self {
        Self::new()
    }
}

impl Lookup for StandardTables {
    fn physical(&self, kind: MeasurementType, raw: u16) -> i32 {
        // Codes past the ADC range saturate
        let index = raw.min(RAW_MAX) as usize;
        self.table(kind)[index]
    }
}

fn build_table(f: fn(i64) -> i64) -> Box<[i32]> {
    (0..TABLE_LEN as i64).map(|code| f(code) as i32).collect()
}

// 0.00 V .. 3.30 V
fn battery_centivolts(code: i64) -> i64 {
    code * 330 / RAW_MAX as i64
}

// -40.00 C .. 125.00 C
fn temperature_centidegrees(code: i64) -> i64 {
    -4000 + code * 16500 / RAW_MAX as i64
}

// 0.00 .. 999.00 relative light units
fn light_centiunits(code: i64) -> i64 {
    code * 99900 / RAW_MAX as i64
}
