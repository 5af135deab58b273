use crate::state::AppState;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use bytes::Bytes;
use serde_json::json;

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Direct-insert escape hatch: stores an arbitrary JSON document, bypassing
/// the per-sensor aggregation entirely. Documents land in their own table so
/// they can never collide with sensor records.
pub async fn post_data(State(app): State<AppState>, body: Bytes) -> impl IntoResponse {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, Json(json!({"error": "No data provided"})))
            .into_response();
    }
    let doc: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(serde_json::Value::Null) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": "No data provided"})))
                .into_response();
        }
        Ok(v) => v,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, Json(json!({"error": format!("invalid json: {e}")})))
                .into_response();
        }
    };
    match app.store.insert_document(doc).await {
        Ok(id) => (
            StatusCode::CREATED,
            Json(json!({"message": "Data inserted successfully", "insertedId": id})),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("document insert failed: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "Internal server error"})))
                .into_response()
        }
    }
}

pub async fn get_sensor(
    State(app): State<AppState>,
    Path(unique_id): Path<String>,
) -> impl IntoResponse {
    match app.store.get_sensor(&unique_id).await {
        Ok(Some(record)) => Json(record).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "unknown sensor").into_response(),
        Err(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response(),
    }
}
