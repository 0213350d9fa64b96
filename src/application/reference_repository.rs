// Collaborator traits for reference tables and device readings
use crate::domain::air_quality::{GasSample, PollutantBreakpoint, SensorReading};
use crate::domain::footprint::{EmissionIndicator, IndicatorCategory};
use async_trait::async_trait;

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// All breakpoint rows, in table order
    async fn breakpoints(&self) -> anyhow::Result<Vec<PollutantBreakpoint>>;

    /// Indicators belonging to one category
    async fn indicators(&self, category: IndicatorCategory) -> anyhow::Result<Vec<EmissionIndicator>>;
}

#[async_trait]
pub trait ReadingSource: Send + Sync {
    /// Most recent reading pushed by the device, if any
    async fn latest_reading(&self) -> anyhow::Result<Option<SensorReading>>;
}

#[async_trait]
pub trait ReadingHistory: Send + Sync {
    /// Archived gas measurements, in no particular order
    async fn gas_samples(&self) -> anyhow::Result<Vec<GasSample>>;
}
