// In-process adapters: footprint records and a settable reading slot
use crate::application::footprint_store::FootprintStore;
use crate::application::reference_repository::{ReadingHistory, ReadingSource};
use crate::domain::air_quality::{GasSample, SensorReading};
use crate::domain::footprint::FootprintRecord;
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
pub struct MemoryFootprintStore {
    records: RwLock<Vec<FootprintRecord>>,
    next_id: AtomicU64,
}

impl MemoryFootprintStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FootprintStore for MemoryFootprintStore {
    async fn save(&self, mut record: FootprintRecord) -> Result<FootprintRecord> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        record.id = format!("fp-{}", id);
        record.created_at = Utc::now();

        self.records.write().await.push(record.clone());
        Ok(record)
    }

    async fn list_for_user(&self, user_id: &str) -> Result<Vec<FootprintRecord>> {
        Ok(self
            .records
            .read()
            .await
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// Holds the latest reading in memory; updated by whoever receives it.
/// Each new data push is also appended to an in-process sample log.
#[derive(Debug, Default)]
pub struct FixedReadingSource {
    latest: RwLock<Option<SensorReading>>,
    log: RwLock<Vec<GasSample>>,
}

impl FixedReadingSource {
    pub fn new(reading: Option<SensorReading>) -> Self {
        let log = reading.as_ref().map(SensorReading::samples).unwrap_or_default();
        Self {
            latest: RwLock::new(reading),
            log: RwLock::new(log),
        }
    }

    pub async fn replace(&self, reading: SensorReading) {
        let mut latest = self.latest.write().await;

        // Heartbeats repeat the previous push; log each push once
        let previous_push = latest.as_ref().and_then(|r| r.last_data_push);
        if reading.last_data_push.is_some() && reading.last_data_push != previous_push {
            self.log.write().await.extend(reading.samples());
        }

        *latest = Some(reading);
    }
}

#[async_trait]
impl ReadingSource for FixedReadingSource {
    async fn latest_reading(&self) -> Result<Option<SensorReading>> {
        Ok(self.latest.read().await.clone())
    }
}

#[async_trait]
impl ReadingHistory for FixedReadingSource {
    async fn gas_samples(&self) -> Result<Vec<GasSample>> {
        Ok(self.log.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::footprint::ReportingPeriod;

    fn record(user: &str) -> FootprintRecord {
        FootprintRecord {
            id: String::new(),
            user_id: user.to_string(),
            period: ReportingPeriod::default(),
            electricity_emission: 1.0,
            transportation_emission: 2.0,
            general_emission: 3.0,
            calculated_value: "0.006".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_assigns_ids_and_filters_by_user() {
        let store = MemoryFootprintStore::new();
        let a = store.save(record("alice")).await.unwrap();
        let b = store.save(record("bob")).await.unwrap();
        store.save(record("alice")).await.unwrap();

        assert_ne!(a.id, b.id);
        assert!(!a.id.is_empty());
        assert_eq!(store.list_for_user("alice").await.unwrap().len(), 2);
        assert_eq!(store.list_for_user("bob").await.unwrap().len(), 1);
        assert!(store.list_for_user("carol").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reading_slot_replace() {
        let source = FixedReadingSource::new(None);
        assert!(source.latest_reading().await.unwrap().is_none());

        let reading = SensorReading::new(Utc::now());
        source.replace(reading.clone()).await;
        assert_eq!(source.latest_reading().await.unwrap(), Some(reading));
    }

    #[tokio::test]
    async fn test_each_push_is_logged_once() {
        use crate::domain::air_quality::Pollutant;

        let source = FixedReadingSource::new(None);
        let pushed_at = Utc::now();
        let reading = SensorReading::new(pushed_at)
            .with_data_push(pushed_at)
            .with_concentration(Pollutant::Co2, 700.0)
            .with_concentration(Pollutant::Co, 1.0);

        source.replace(SensorReading::new(pushed_at)).await;
        assert!(source.gas_samples().await.unwrap().is_empty());

        source.replace(reading.clone()).await;
        let mut heartbeat = reading.clone();
        heartbeat.timestamp = pushed_at + chrono::Duration::seconds(30);
        source.replace(heartbeat).await;
        assert_eq!(source.gas_samples().await.unwrap().len(), 2);

        let mut next = reading;
        next.last_data_push = Some(pushed_at + chrono::Duration::minutes(5));
        source.replace(next).await;
        assert_eq!(source.gas_samples().await.unwrap().len(), 4);
    }
}
