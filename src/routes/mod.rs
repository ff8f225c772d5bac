pub mod health;
pub mod ingest;
pub mod stats;

use axum::Router;
use tower_http::decompression::RequestDecompressionLayer;

use crate::state::AppState;

/// Public listener: sensors push readings here, optionally gzip, deflate or br encoded.
pub fn sensor_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(ingest::router())
        .layer(RequestDecompressionLayer::new())
        .with_state(state)
}

/// Operator listener serving the period reports.
pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(stats::router())
        .with_state(state)
}
