use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::engine::AggregationEngine;
use crate::error::{AppError, AppResult};
use crate::model::{Reading, SensorId};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MeasurementRequest {
    sensor_id: SensorId,
    time: DateTime<Utc>,
    value: f64,
}

// Sensors do not reliably send a JSON content type, so the body is parsed by hand.
// Compressed bodies are inflated by the router's decompression layer; a body that
// fails to inflate surfaces here as a buffering rejection.
pub(crate) async fn post_measurement(
    State(engine): State<AggregationEngine>,
    body: Result<Bytes, BytesRejection>,
) -> AppResult<StatusCode> {
    let body = body.map_err(|rejection| {
        AppError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("unreadable measurement body: {}", rejection.body_text()),
        )
    })?;
    let payload: MeasurementRequest = serde_json::from_slice(&body)
        .map_err(|err| AppError::bad_request(format!("invalid measurement: {err}")))?;
    let reading = Reading::new(payload.sensor_id, payload.time, payload.value)?;

    if let Err(err) = engine.record(&reading).await {
        tracing::warn!(
            sensor = reading.sensor_id,
            time = %reading.time,
            error = %err,
            "dropped reading after storage failure"
        );
        return Err(err.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/api/v1/measurement", post(post_measurement))
}
