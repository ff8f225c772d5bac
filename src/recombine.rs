use crate::model::{
    day_start, next_day, Aggregate, Bucket, Period, PeriodAggregate, SensorId, SensorScope,
};
use std::collections::BTreeMap;

// Every function here works on day buckets only. Averages are always rebuilt from
// summed `sum` and summed `count`; the per-bucket `avg` is never read.

pub fn total(period: Period, buckets: &[Bucket]) -> PeriodAggregate {
    let mut stats = Aggregate::EMPTY;
    for bucket in buckets {
        stats.merge(&bucket.stats);
    }
    PeriodAggregate {
        period_start: day_start(period.start()),
        period_end: day_start(period.end()),
        sensor_id: SensorScope::All,
        stats,
    }
}

pub fn per_sensor(period: Period, buckets: &[Bucket]) -> Vec<PeriodAggregate> {
    let mut by_sensor: BTreeMap<SensorId, Aggregate> = BTreeMap::new();
    for bucket in buckets.iter().filter(|bucket| !bucket.stats.is_empty()) {
        by_sensor
            .entry(bucket.sensor_id)
            .or_insert(Aggregate::EMPTY)
            .merge(&bucket.stats);
    }
    by_sensor
        .into_iter()
        .map(|(sensor_id, stats)| PeriodAggregate {
            period_start: day_start(period.start()),
            period_end: day_start(period.end()),
            sensor_id: SensorScope::Sensor(sensor_id),
            stats,
        })
        .collect()
}

/// One row per non-empty `(sensor, day)`, each spanning `[day, day + 1)`.
///
/// Row ends never pass `period.end()`, which also covers the last representable day.
pub fn per_sensor_and_day(period: Period, buckets: &[Bucket]) -> Vec<PeriodAggregate> {
    let mut by_key: BTreeMap<(SensorId, chrono::NaiveDate), Aggregate> = BTreeMap::new();
    for bucket in buckets.iter().filter(|bucket| !bucket.stats.is_empty()) {
        by_key
            .entry((bucket.sensor_id, bucket.day))
            .or_insert(Aggregate::EMPTY)
            .merge(&bucket.stats);
    }
    by_key
        .into_iter()
        .map(|((sensor_id, day), stats)| {
            let end = next_day(day).map_or(period.end(), |next| next.min(period.end()));
            PeriodAggregate {
                period_start: day_start(day),
                period_end: day_start(end),
                sensor_id: SensorScope::Sensor(sensor_id),
                stats,
            }
        })
        .collect()
}
