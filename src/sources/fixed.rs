use super::{RawReading, SampleSource};
use crate::errors::SourceResult;
use async_trait::async_trait;

/// Reports the same codes on every acquisition
pub struct FixedSource {
    id: String,
    reading: RawReading,
}

impl FixedSource {
    pub fn new(id: String, codes: [u16; 3]) -> Self {
        let [battery, temperature, light] = codes;
        Self {
            id,
            reading: RawReading { battery, temperature, light },
        }
    }
}

#[async_trait]
impl SampleSource for FixedSource {
    async fn acquire(&mut self) -> SourceResult<RawReading> {
        Ok(self.reading)
    }

    fn id(&self) -> &str {
        &self.id
    }
}
