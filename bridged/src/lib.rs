pub mod config;
pub mod http;
pub mod listener;
pub mod state;
pub mod telemetry;
pub mod wiring;

use crate::{config::Config, http::serve, telemetry::init_tracing, wiring::build_state};

pub async fn run(cfg: Config) -> anyhow::Result<()> {
    init_tracing()?;
    let app_state = build_state(&cfg).await?;
    listener::spawn(app_state.clone(), cfg.topic.clone());
    serve(app_state, cfg).await
}
