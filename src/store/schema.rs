use anyhow::{Context, Result};
use sqlx::PgPool;

const CREATE_MEASUREMENT: &str = r#"
CREATE TABLE IF NOT EXISTS measurement (
    measurement_day date NOT NULL,
    sensor_id integer NOT NULL,
    total_count bigint NOT NULL CHECK (total_count >= 0),
    total_sum double precision NOT NULL,
    avg_value double precision NOT NULL,
    min_value double precision NOT NULL,
    max_value double precision NOT NULL,
    PRIMARY KEY (measurement_day, sensor_id)
)
"#;

// Range scans filter on the day and order by sensor first.
const CREATE_SENSOR_DAY_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS measurement_sensor_day_idx
    ON measurement (sensor_id, measurement_day)
"#;

pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(CREATE_MEASUREMENT)
        .execute(pool)
        .await
        .context("failed to create measurement table")?;
    sqlx::query(CREATE_SENSOR_DAY_INDEX)
        .execute(pool)
        .await
        .context("failed to create measurement index")?;
    tracing::info!("measurement schema ready");
    Ok(())
}
