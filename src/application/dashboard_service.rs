// Dashboard service - Use case for rating the latest sensor reading
use crate::application::aqi_engine::{
    classify_index, is_live, reduce_sub_indices, sub_indices, unrated_pollutants,
};
use crate::application::reference_repository::{ReadingSource, ReferenceRepository};
use crate::domain::air_quality::{Pollutant, PollutantBreakpoint, SensorReading};
use crate::domain::dashboard::{AqiSummary, DashboardSnapshot};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Rating of an arbitrary reading, independent of device liveness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReadingEvaluation {
    pub aqi: AqiSummary,
    pub unrated_pollutants: Vec<Pollutant>,
}

#[derive(Clone)]
pub struct DashboardService {
    references: Arc<dyn ReferenceRepository>,
    readings: Arc<dyn ReadingSource>,
    tolerance: Duration,
}

impl DashboardService {
    pub fn new(
        references: Arc<dyn ReferenceRepository>,
        readings: Arc<dyn ReadingSource>,
        tolerance: Duration,
    ) -> Self {
        Self {
            references,
            readings,
            tolerance,
        }
    }

    pub async fn snapshot(&self) -> anyhow::Result<DashboardSnapshot> {
        self.snapshot_at(Utc::now()).await
    }

    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> anyhow::Result<DashboardSnapshot> {
        let reading = self.readings.latest_reading().await?;

        let Some(reading) = reading.filter(|r| is_live(Some(r), now, self.tolerance)) else {
            tracing::debug!("No live reading within {}s", self.tolerance.num_seconds());
            return Ok(DashboardSnapshot::disconnected());
        };

        let breakpoints = self.references.breakpoints().await?;
        let unrated = self.unrated(&breakpoints);

        let aqi = if reading.has_measurements() {
            Some(rate(&reading, &breakpoints))
        } else {
            tracing::debug!("Device is alive but has not pushed measurements yet");
            None
        };

        Ok(DashboardSnapshot {
            connected: true,
            aqi,
            temperature: reading.temperature.map(|t| t.round() as i64),
            humidity: reading.humidity.map(|h| h.round() as i64),
            last_updated: reading.last_data_push,
            unrated_pollutants: unrated,
        })
    }

    pub async fn evaluate(&self, reading: &SensorReading) -> anyhow::Result<ReadingEvaluation> {
        let breakpoints = self.references.breakpoints().await?;
        Ok(ReadingEvaluation {
            aqi: rate(reading, &breakpoints),
            unrated_pollutants: self.unrated(&breakpoints),
        })
    }

    fn unrated(&self, breakpoints: &[PollutantBreakpoint]) -> Vec<Pollutant> {
        let unrated = unrated_pollutants(breakpoints);
        if !unrated.is_empty() {
            tracing::warn!(
                "No breakpoints for {:?}; their sub-index falls back to 0",
                unrated
            );
        }
        unrated
    }
}

fn rate(reading: &SensorReading, breakpoints: &[PollutantBreakpoint]) -> AqiSummary {
    let sub = sub_indices(reading, breakpoints);
    let value = reduce_sub_indices(sub.values().copied());
    AqiSummary::new(value, classify_index(value), sub)
}
