use crate::{http::handlers as h, state::AppState};
use axum::{
    Router,
    routing::{get, post},
};

pub fn build(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(h::healthz))
        .route("/api/post_data", post(h::post_data))
        .route("/api/sensors/{unique_id}", get(h::get_sensor))
        .with_state(state)
}
