use crate::engine::AggregationEngine;
use axum::extract::FromRef;

#[derive(Clone)]
pub struct AppState {
    pub engine: AggregationEngine,
    pub report_window_days: u64,
}

impl FromRef<AppState> for AggregationEngine {
    fn from_ref(state: &AppState) -> AggregationEngine {
        state.engine.clone()
    }
}
