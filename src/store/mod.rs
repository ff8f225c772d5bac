mod memory;
mod postgres;
pub mod schema;

pub use memory::MemoryBucketStore;
pub use postgres::{PgBucketStore, PgPoolSettings};

use crate::model::{Bucket, Period, SensorId};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(#[from] sqlx::Error),
    #[error("storage call exceeded its {0:?} deadline")]
    Timeout(Duration),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Durable per-(sensor, day) aggregate storage.
///
/// `upsert` must behave as one indivisible read-modify-write per call: after any set
/// of concurrent upserts to a key completes, the bucket equals the result of applying
/// the same readings in some sequential order. Contention is resolved inside the
/// implementation and never surfaced to callers.
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn upsert(&self, day: NaiveDate, sensor_id: SensorId, value: f64) -> StoreResult<()>;

    /// Returns a zero bucket when nothing was recorded for the key.
    async fn get_day(&self, day: NaiveDate, sensor_id: SensorId) -> StoreResult<Bucket>;

    /// Buckets with `day` in `[start, end)`, ordered by `(sensor_id, day)`.
    async fn query_range(&self, period: Period) -> StoreResult<Vec<Bucket>>;

    async fn reset(&self) -> StoreResult<()>;

    async fn close(&self) {}
}
