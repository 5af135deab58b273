use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single measurement appended to a sensor's history. The timestamp is
/// assigned by the bridge when the message is accepted, never taken from the
/// sensor, so per-sensor ordering reflects server-observed arrival order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    pub value: f64,
    pub time: DateTime<Utc>,
}

/// Persisted record for one registered sensor. `unique_id` is the external
/// identifier the sensor embeds in its telemetry, not a generated key.
/// `readings` is append-only; insertion order is chronological order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorRecord {
    pub unique_id: String,
    pub readings: Vec<Reading>,
}

/// Decoded form of one raw telemetry message.
#[derive(Debug, Clone, PartialEq)]
pub struct Telemetry {
    pub unique_id: String,
    pub value: f64,
}
