use crate::state::AppState;
use bridge_core::{decode::decode, engine::Outcome};
use bytes::Bytes;
use metrics::counter;
use tokio_stream::StreamExt;

/// Subscribes to the telemetry topic and feeds each message through the
/// upsert engine. Every message is handled in its own task so one slow
/// storage write never stalls ingestion of the next message; a failure is
/// contained to the message that caused it.
pub fn spawn(app: AppState, topic: String) {
    tokio::spawn(async move {
        match app.bus.subscribe(&topic).await {
            Ok(mut stream) => {
                tracing::info!(%topic, "listening for telemetry");
                while let Some(msg) = stream.next().await {
                    let app = app.clone();
                    tokio::spawn(async move {
                        handle_message(app, msg.payload).await;
                    });
                }
            }
            Err(e) => tracing::error!("failed to subscribe to telemetry topic {topic}: {e}"),
        }
    });
}

pub async fn handle_message(app: AppState, payload: Bytes) {
    let telemetry = match decode(&payload) {
        Ok(t) => t,
        Err(e) => {
            counter!("ingest.decode_error").increment(1);
            tracing::warn!("bad telemetry payload: {e}");
            return;
        }
    };

    match app.engine.apply(&telemetry.unique_id, telemetry.value).await {
        Ok(Outcome::Appended) => {
            counter!("ingest.appended").increment(1);
            tracing::debug!(unique_id = %telemetry.unique_id, value = telemetry.value, "reading appended");
        }
        Ok(Outcome::UnknownSensor) => {
            counter!("ingest.unknown_sensor").increment(1);
            tracing::warn!(unique_id = %telemetry.unique_id, "sensor does not exist");
        }
        Err(e) => {
            counter!("ingest.storage_error").increment(1);
            tracing::warn!(unique_id = %telemetry.unique_id, "reading append failed: {e}");
        }
    }
}
