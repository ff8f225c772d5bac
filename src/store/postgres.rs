use super::{BucketStore, StoreResult};
use crate::model::{Aggregate, Bucket, Period, SensorId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions, PgRow};
use sqlx::{ConnectOptions, PgPool, Row};
use std::str::FromStr;
use std::time::Duration;

// A single conflict-resolving statement: Postgres takes the row lock for the key,
// so concurrent writers to one bucket queue behind each other and each sees the
// previous writer's committed totals.
const UPSERT_MEASUREMENT: &str = r#"
INSERT INTO measurement (
    measurement_day, sensor_id, total_count, total_sum, avg_value, min_value, max_value)
VALUES ($1, $2, 1, $3, $3, $3, $3)
ON CONFLICT (measurement_day, sensor_id) DO UPDATE
SET total_count = measurement.total_count + 1,
    total_sum = measurement.total_sum + EXCLUDED.total_sum,
    avg_value = (measurement.total_sum + EXCLUDED.total_sum) / (measurement.total_count + 1),
    min_value = LEAST(measurement.min_value, EXCLUDED.min_value),
    max_value = GREATEST(measurement.max_value, EXCLUDED.max_value)
"#;

const SELECT_DAY: &str = r#"
SELECT measurement_day, sensor_id, total_count, total_sum, avg_value, min_value, max_value
FROM measurement
WHERE measurement_day = $1 AND sensor_id = $2
"#;

const SELECT_RANGE: &str = r#"
SELECT measurement_day, sensor_id, total_count, total_sum, avg_value, min_value, max_value
FROM measurement
WHERE measurement_day >= $1 AND measurement_day < $2
ORDER BY sensor_id, measurement_day
"#;

#[derive(Clone, Debug)]
pub struct PgPoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub log_statements: bool,
}

impl Default for PgPoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Duration::from_secs(8),
            log_statements: false,
        }
    }
}

#[derive(Clone)]
pub struct PgBucketStore {
    pool: PgPool,
}

impl PgBucketStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, settings: &PgPoolSettings) -> Result<Self> {
        let mut options = PgConnectOptions::from_str(database_url)
            .context("failed to parse database URL")?;
        if !settings.log_statements {
            options = options.disable_statement_logging();
        }
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .acquire_timeout(settings.acquire_timeout)
            .connect_with(options)
            .await
            .context("failed to connect to database")?;
        tracing::info!(
            max_connections = settings.max_connections,
            "connected to database"
        );
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn bucket_from_row(row: &PgRow) -> Result<Bucket, sqlx::Error> {
    Ok(Bucket {
        day: row.try_get("measurement_day")?,
        sensor_id: row.try_get("sensor_id")?,
        stats: Aggregate {
            count: row.try_get("total_count")?,
            sum: row.try_get("total_sum")?,
            avg: row.try_get("avg_value")?,
            min: row.try_get("min_value")?,
            max: row.try_get("max_value")?,
        },
    })
}

#[async_trait]
impl BucketStore for PgBucketStore {
    async fn upsert(&self, day: NaiveDate, sensor_id: SensorId, value: f64) -> StoreResult<()> {
        sqlx::query(UPSERT_MEASUREMENT)
            .bind(day)
            .bind(sensor_id)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_day(&self, day: NaiveDate, sensor_id: SensorId) -> StoreResult<Bucket> {
        let row = sqlx::query(SELECT_DAY)
            .bind(day)
            .bind(sensor_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(bucket_from_row(&row)?),
            None => Ok(Bucket::empty(day, sensor_id)),
        }
    }

    async fn query_range(&self, period: Period) -> StoreResult<Vec<Bucket>> {
        let rows = sqlx::query(SELECT_RANGE)
            .bind(period.start())
            .bind(period.end())
            .fetch_all(&self.pool)
            .await?;
        let buckets = rows
            .iter()
            .map(bucket_from_row)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(buckets)
    }

    async fn reset(&self) -> StoreResult<()> {
        sqlx::query("TRUNCATE measurement")
            .execute(&self.pool)
            .await?;
        tracing::debug!("measurement table truncated");
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}
