use super::{RawReading, SampleSource};
use crate::errors::SourceResult;
use crate::lookup::RAW_MAX;
use async_trait::async_trait;

// Temperature swings between these codes (about 0 C to 45 C)
const TEMP_LOW: u16 = 248;
const TEMP_HIGH: u16 = 527;

/// Deterministic stand-in for a radio sensor node.
///
/// Battery drains one code every 16 acquisitions and wraps back to full,
/// temperature follows a slow triangle wave, light a fast one.
pub struct SimulatedSource {
    id: String,
    step: u32,
}

impl SimulatedSource {
    pub fn new(id: String) -> Self {
        Self { id, step: 0 }
    }

    fn reading_at(step: u32) -> RawReading {
        let span = u32::from(RAW_MAX) + 1;
        RawReading {
            battery: RAW_MAX - ((step / 16) % span) as u16,
            temperature: triangle(step, TEMP_LOW, TEMP_HIGH),
            light: triangle(step.wrapping_mul(8), 0, RAW_MAX),
        }
    }
}

fn triangle(step: u32, low: u16, high: u16) -> u16 {
    let span = u32::from(high - low);
    let phase = step % (2 * span);
    let offset = if phase < span { phase } else { 2 * span - phase };
    low + offset as u16
}

#[async_trait]
impl SampleSource for SimulatedSource {
    async fn acquire(&mut self) -> SourceResult<RawReading> {
        let reading = Self::reading_at(self.step);
        self.step = self.step.wrapping_add(1);
        Ok(reading)
    }

    fn id(&self) -> &str {
        &self.id
    }
}
