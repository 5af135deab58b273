use crate::model::{Reading, SensorRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use sqlx::{
    PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use uuid::Uuid;

/// Persistence boundary for the ingestion pipeline.
///
/// `append_reading` is the load-bearing operation: it must append in a single
/// atomic step so two concurrent readings for the same sensor are both kept.
/// A return of 0 means no sensor with that `unique_id` exists; the engine
/// never creates one implicitly.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_sensor(&self, unique_id: &str) -> Result<Option<SensorRecord>>;
    async fn append_reading(&self, unique_id: &str, reading: Reading) -> Result<u64>;
    async fn register_sensor(&self, unique_id: &str) -> Result<()>;

    async fn insert_document(&self, body: serde_json::Value) -> Result<Uuid>;
    async fn get_document(&self, id: Uuid) -> Result<Option<serde_json::Value>>;
}

#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;

        sqlx::migrate!().run(&pool).await?;
        tracing::info!("connected to postgres");

        Ok(Self { pool })
    }

    fn row_to_sensor(row: PgRow) -> Result<SensorRecord> {
        let readings: serde_json::Value = row.try_get("readings")?;
        Ok(SensorRecord {
            unique_id: row.try_get("unique_id")?,
            readings: serde_json::from_value(readings).context("invalid readings column")?,
        })
    }
}

#[derive(Default, Clone)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    sensors: HashMap<String, SensorRecord>,
    documents: HashMap<Uuid, serde_json::Value>,
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn get_sensor(&self, unique_id: &str) -> Result<Option<SensorRecord>> {
        let g = self.inner.read().unwrap();
        Ok(g.sensors.get(unique_id).cloned())
    }

    async fn append_reading(&self, unique_id: &str, reading: Reading) -> Result<u64> {
        let mut g = self.inner.write().unwrap();
        match g.sensors.get_mut(unique_id) {
            Some(record) => {
                record.readings.push(reading);
                Ok(1)
            }
            None => Ok(0),
        }
    }

    async fn register_sensor(&self, unique_id: &str) -> Result<()> {
        let mut g = self.inner.write().unwrap();
        g.sensors.entry(unique_id.to_string()).or_insert_with(|| SensorRecord {
            unique_id: unique_id.to_string(),
            readings: Vec::new(),
        });
        Ok(())
    }

    async fn insert_document(&self, body: serde_json::Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        let mut g = self.inner.write().unwrap();
        g.documents.insert(id, body);
        Ok(id)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<serde_json::Value>> {
        let g = self.inner.read().unwrap();
        Ok(g.documents.get(&id).cloned())
    }
}

#[async_trait]
impl Storage for PostgresStorage {
    async fn get_sensor(&self, unique_id: &str) -> Result<Option<SensorRecord>> {
        let row = sqlx::query("SELECT unique_id, readings FROM sensors WHERE unique_id = $1")
            .bind(unique_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(Self::row_to_sensor).transpose()?)
    }

    async fn append_reading(&self, unique_id: &str, reading: Reading) -> Result<u64> {
        // Single statement so concurrent appends to one sensor serialize in
        // the database instead of racing a find-then-update round trip.
        let result =
            sqlx::query("UPDATE sensors SET readings = readings || $2::jsonb WHERE unique_id = $1")
                .bind(unique_id)
                .bind(json!([reading]))
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected())
    }

    async fn register_sensor(&self, unique_id: &str) -> Result<()> {
        sqlx::query(
            "INSERT INTO sensors (unique_id, readings) VALUES ($1, '[]'::jsonb)
            ON CONFLICT (unique_id) DO NOTHING",
        )
        .bind(unique_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_document(&self, body: serde_json::Value) -> Result<Uuid> {
        let id = Uuid::new_v4();
        sqlx::query("INSERT INTO documents (id, body) VALUES ($1, $2)")
            .bind(id)
            .bind(body)
            .execute(&self.pool)
            .await?;

        Ok(id)
    }

    async fn get_document(&self, id: Uuid) -> Result<Option<serde_json::Value>> {
        let row = sqlx::query("SELECT body FROM documents WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.try_get("body")).transpose()?)
    }
}
