use std::sync::Arc;

use bridge_core::{bus::Bus, engine::UpsertEngine, storage::Storage};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Storage>,
    pub bus: Arc<dyn Bus>,
    pub engine: Arc<UpsertEngine>,
}
