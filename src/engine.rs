use crate::model::{Bucket, Period, PeriodAggregate, Reading, SensorId};
use crate::recombine;
use crate::store::{BucketStore, StoreError, StoreResult};
use chrono::NaiveDate;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct AggregationEngine {
    store: Arc<dyn BucketStore>,
    deadline: Option<Duration>,
}

impl AggregationEngine {
    pub fn new(store: Arc<dyn BucketStore>, deadline: Option<Duration>) -> Self {
        Self { store, deadline }
    }

    pub fn store(&self) -> &Arc<dyn BucketStore> {
        &self.store
    }

    /// Folds a reading into its (sensor, UTC day) bucket.
    ///
    /// A failed write is not retried or queued; the reading is lost and the error is
    /// returned to the caller.
    pub async fn record(&self, reading: &Reading) -> StoreResult<()> {
        let day = reading.day();
        self.bounded(
            "upsert",
            self.store.upsert(day, reading.sensor_id, reading.value),
        )
        .await?;
        tracing::trace!(sensor = reading.sensor_id, %day, value = reading.value, "recorded reading");
        Ok(())
    }

    pub async fn day_stats(&self, day: NaiveDate, sensor_id: SensorId) -> StoreResult<Bucket> {
        self.bounded("get_day", self.store.get_day(day, sensor_id))
            .await
    }

    pub async fn total_for_period(&self, period: Period) -> StoreResult<PeriodAggregate> {
        let buckets = self.buckets(period).await?;
        Ok(recombine::total(period, &buckets))
    }

    pub async fn per_sensor_for_period(&self, period: Period) -> StoreResult<Vec<PeriodAggregate>> {
        let buckets = self.buckets(period).await?;
        Ok(recombine::per_sensor(period, &buckets))
    }

    pub async fn per_sensor_and_day_for_period(
        &self,
        period: Period,
    ) -> StoreResult<Vec<PeriodAggregate>> {
        let buckets = self.buckets(period).await?;
        let rows = recombine::per_sensor_and_day(period, &buckets);
        Ok(rows)
    }

    async fn buckets(&self, period: Period) -> StoreResult<Vec<Bucket>> {
        let buckets = self
            .bounded("query_range", self.store.query_range(period))
            .await?;
        tracing::debug!(
            start = %period.start(),
            end = %period.end(),
            buckets = buckets.len(),
            "loaded buckets for period"
        );
        Ok(buckets)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = StoreResult<T>>,
    ) -> StoreResult<T> {
        let result = match self.deadline {
            Some(deadline) => match tokio::time::timeout(deadline, call).await {
                Ok(result) => result,
                Err(_) => Err(StoreError::Timeout(deadline)),
            },
            None => call.await,
        };
        if let Err(err) = &result {
            tracing::error!(operation, error = %err, "bucket store call failed");
        }
        result
    }
}
