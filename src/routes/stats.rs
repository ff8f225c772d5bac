use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::model::{Bucket, Period, PeriodAggregate, SensorId};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WindowQuery {
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DayQuery {
    sensor_id: SensorId,
    day: NaiveDate,
}

fn resolve_period(query: &WindowQuery, today: NaiveDate, window_days: u64) -> AppResult<Period> {
    match (query.start, query.end) {
        (None, None) => Ok(Period::trailing_days(today, window_days)?),
        (Some(start), Some(end)) => Ok(Period::new(start, end)?),
        _ => Err(AppError::bad_request(
            "start and end must be provided together",
        )),
    }
}

fn requested_period(state: &AppState, query: &WindowQuery) -> AppResult<Period> {
    let today = Utc::now().date_naive();
    resolve_period(query, today, state.report_window_days)
}

pub(crate) async fn stats_total(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<PeriodAggregate>> {
    let period = requested_period(&state, &query)?;
    let total = state.engine.total_for_period(period).await?;
    Ok(Json(total))
}

pub(crate) async fn stats_each_sensor(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<Vec<PeriodAggregate>>> {
    let period = requested_period(&state, &query)?;
    let rows = state.engine.per_sensor_for_period(period).await?;
    Ok(Json(rows))
}

pub(crate) async fn stats_each_sensor_and_day(
    State(state): State<AppState>,
    Query(query): Query<WindowQuery>,
) -> AppResult<Json<Vec<PeriodAggregate>>> {
    let period = requested_period(&state, &query)?;
    let rows = state.engine.per_sensor_and_day_for_period(period).await?;
    Ok(Json(rows))
}

pub(crate) async fn stats_day(
    State(state): State<AppState>,
    Query(query): Query<DayQuery>,
) -> AppResult<Json<Bucket>> {
    let bucket = state.engine.day_stats(query.day, query.sensor_id).await?;
    Ok(Json(bucket))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/stats/Total", get(stats_total))
        .route("/api/v1/stats/EachSensor", get(stats_each_sensor))
        .route("/api/v1/stats/EachSensorAndDay", get(stats_each_sensor_and_day))
        .route("/api/v1/stats/Day", get(stats_day))
}
