use crate::model::{Reading, SensorRecord};
use crate::storage::Storage;
use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of applying one decoded reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Appended,
    /// No record with the given `unique_id` exists. Expected in normal
    /// operation (sensors are registered out-of-band), never fatal.
    UnknownSensor,
}

/// Appends decoded readings to the matching sensor record.
///
/// The reading's timestamp is taken when the message is accepted here, not
/// when it was sent or enqueued, so each record's history reflects
/// server-observed arrival order. Atomicity of the append itself is the
/// storage layer's contract.
pub struct UpsertEngine {
    store: Arc<dyn Storage>,
    op_timeout: Duration,
}

impl UpsertEngine {
    pub fn new(store: Arc<dyn Storage>, op_timeout: Duration) -> Self {
        Self { store, op_timeout }
    }

    pub async fn apply(&self, unique_id: &str, value: f64) -> Result<Outcome> {
        let reading = Reading { value, time: Utc::now() };

        let modified = tokio::time::timeout(
            self.op_timeout,
            self.store.append_reading(unique_id, reading),
        )
        .await
        .map_err(|_| anyhow!("storage append timed out after {:?}", self.op_timeout))?
        .context("append reading")?;

        if modified == 0 {
            return Ok(Outcome::UnknownSensor);
        }
        Ok(Outcome::Appended)
    }
}

/// Pure form of the append used by the in-memory path and tests. The
/// Postgres path appends inside a single SQL statement instead, because
/// that is where the no-lost-update guarantee lives.
pub fn append_to_record(mut record: SensorRecord, reading: Reading) -> SensorRecord {
    record.readings.push(reading);
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use async_trait::async_trait;
    use uuid::Uuid;

    fn engine(store: Arc<dyn Storage>) -> UpsertEngine {
        UpsertEngine::new(store, Duration::from_secs(5))
    }

    #[tokio::test]
    async fn appends_to_existing_sensor() {
        let store = Arc::new(InMemoryStorage::default());
        store.register_sensor("sensor-1").await.unwrap();

        let outcome = engine(store.clone()).apply("sensor-1", 23.5).await.unwrap();
        assert_eq!(outcome, Outcome::Appended);

        let record = store.get_sensor("sensor-1").await.unwrap().unwrap();
        assert_eq!(record.readings.len(), 1);
        assert_eq!(record.readings[0].value, 23.5);
    }

    #[tokio::test]
    async fn unknown_sensor_leaves_storage_unchanged() {
        let store = Arc::new(InMemoryStorage::default());
        store.register_sensor("sensor-1").await.unwrap();

        let outcome = engine(store.clone()).apply("sensor-9", 1.0).await.unwrap();
        assert_eq!(outcome, Outcome::UnknownSensor);

        assert!(store.get_sensor("sensor-9").await.unwrap().is_none());
        let untouched = store.get_sensor("sensor-1").await.unwrap().unwrap();
        assert!(untouched.readings.is_empty());
    }

    #[tokio::test]
    async fn lookup_is_case_sensitive() {
        let store = Arc::new(InMemoryStorage::default());
        store.register_sensor("Sensor-1").await.unwrap();

        let outcome = engine(store).apply("sensor-1", 1.0).await.unwrap();
        assert_eq!(outcome, Outcome::UnknownSensor);
    }

    #[tokio::test]
    async fn concurrent_appends_all_survive() {
        let store = Arc::new(InMemoryStorage::default());
        store.register_sensor("sensor-1").await.unwrap();
        let engine = Arc::new(engine(store.clone()));

        let mut handles = Vec::new();
        for i in 0..50 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.apply("sensor-1", i as f64).await.unwrap()
            }));
        }
        for h in handles {
            assert_eq!(h.await.unwrap(), Outcome::Appended);
        }

        let record = store.get_sensor("sensor-1").await.unwrap().unwrap();
        assert_eq!(record.readings.len(), 50);
    }

    #[tokio::test]
    async fn reading_timestamps_follow_arrival_order() {
        let store = Arc::new(InMemoryStorage::default());
        store.register_sensor("sensor-1").await.unwrap();
        let engine = engine(store.clone());

        engine.apply("sensor-1", 1.0).await.unwrap();
        engine.apply("sensor-1", 2.0).await.unwrap();

        let record = store.get_sensor("sensor-1").await.unwrap().unwrap();
        assert!(record.readings[0].time <= record.readings[1].time);
    }

    #[test]
    fn append_to_record_is_append_only() {
        let record = SensorRecord { unique_id: "s1".into(), readings: Vec::new() };
        let r1 = Reading { value: 1.0, time: Utc::now() };
        let r2 = Reading { value: 2.0, time: Utc::now() };

        let record = append_to_record(record, r1.clone());
        let record = append_to_record(record, r2.clone());
        assert_eq!(record.readings, vec![r1, r2]);
    }

    struct StalledStorage;

    #[async_trait]
    impl Storage for StalledStorage {
        async fn get_sensor(&self, _: &str) -> Result<Option<SensorRecord>> {
            unreachable!()
        }
        async fn append_reading(&self, _: &str, _: Reading) -> Result<u64> {
            std::future::pending().await
        }
        async fn register_sensor(&self, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn insert_document(&self, _: serde_json::Value) -> Result<Uuid> {
            unreachable!()
        }
        async fn get_document(&self, _: Uuid) -> Result<Option<serde_json::Value>> {
            unreachable!()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn unresponsive_storage_times_out() {
        let engine = UpsertEngine::new(Arc::new(StalledStorage), Duration::from_secs(1));
        let err = engine.apply("sensor-1", 1.0).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
