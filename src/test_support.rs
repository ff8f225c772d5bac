use crate::engine::AggregationEngine;
use crate::model::{day_start, Aggregate, Period, SensorScope};
use crate::store::BucketStore;
use chrono::NaiveDate;
use std::sync::Arc;

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, d).expect("valid January 2023 day")
}

fn constant(count: i64, value: f64) -> Aggregate {
    Aggregate {
        count,
        sum: count as f64 * value,
        avg: value,
        min: value,
        max: value,
    }
}

pub async fn scenario_store_and_read_back(store: &dyn BucketStore) {
    let absent = store.get_day(day(1), 1).await.expect("get_day");
    assert_eq!(absent.stats, Aggregate::EMPTY);
    assert_eq!(absent.day, day(1));
    assert_eq!(absent.sensor_id, 1);

    store.upsert(day(1), 1, 1.0).await.expect("upsert");
    let first = store.get_day(day(1), 1).await.expect("get_day");
    assert_eq!(first.stats, Aggregate::single(1.0));

    store.upsert(day(1), 1, 2.0).await.expect("upsert");
    store.upsert(day(1), 1, 3.0).await.expect("upsert");
    store.upsert(day(2), 1, 4.0).await.expect("upsert");

    let expected = Aggregate {
        count: 3,
        sum: 6.0,
        avg: 2.0,
        min: 1.0,
        max: 3.0,
    };
    assert_eq!(store.get_day(day(1), 1).await.expect("get_day").stats, expected);
    assert_eq!(
        store.get_day(day(2), 1).await.expect("get_day").stats,
        Aggregate::single(4.0)
    );
    assert_eq!(
        store.get_day(day(1), 2).await.expect("get_day").stats,
        Aggregate::EMPTY
    );
}

pub async fn scenario_parallel_upserts(store: Arc<dyn BucketStore>, writers: usize) {
    let handles: Vec<_> = (0..writers)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.upsert(day(3), 1, 1.0).await })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.expect("writer task").expect("upsert");
    }

    let bucket = store.get_day(day(3), 1).await.expect("get_day");
    assert_eq!(bucket.stats, constant(writers as i64, 1.0));
}

pub async fn scenario_parallel_mixed_keys(store: Arc<dyn BucketStore>) {
    const SENSORS: i32 = 8;
    const PER_SENSOR: i32 = 250;

    let handles: Vec<_> = (0..SENSORS * PER_SENSOR)
        .map(|i| {
            let store = store.clone();
            let sensor_id = i % SENSORS + 1;
            let value = f64::from(i / SENSORS);
            tokio::spawn(async move { store.upsert(day(5), sensor_id, value).await })
        })
        .collect();
    for result in futures::future::join_all(handles).await {
        result.expect("writer task").expect("upsert");
    }

    let expected_sum = f64::from(PER_SENSOR * (PER_SENSOR - 1) / 2);
    for sensor_id in 1..=SENSORS {
        let bucket = store.get_day(day(5), sensor_id).await.expect("get_day");
        assert_eq!(bucket.stats.count, i64::from(PER_SENSOR));
        assert_eq!(bucket.stats.sum, expected_sum);
        assert_eq!(bucket.stats.min, 0.0);
        assert_eq!(bucket.stats.max, f64::from(PER_SENSOR - 1));
        assert_eq!(bucket.stats.avg, expected_sum / f64::from(PER_SENSOR));
    }
}

pub async fn scenario_order_independence(store: &dyn BucketStore) {
    // Small integers keep every partial sum exact, so any order must agree bit for bit.
    let readings = [4.0, -2.0, 9.0, 0.0, 9.0, 1.0, -7.0];
    let forward: Vec<f64> = readings.to_vec();
    let backward: Vec<f64> = readings.iter().rev().copied().collect();
    let mut interleaved: Vec<f64> = readings.iter().step_by(2).copied().collect();
    interleaved.extend(readings.iter().skip(1).step_by(2).copied());

    for (sensor_id, order) in [(1, &forward), (2, &backward), (3, &interleaved)] {
        for value in order {
            store.upsert(day(4), sensor_id, *value).await.expect("upsert");
        }
    }

    let reference = store.get_day(day(4), 1).await.expect("get_day").stats;
    assert_eq!(reference.count, readings.len() as i64);
    assert_eq!(reference.sum, 14.0);
    assert_eq!(reference.min, -7.0);
    assert_eq!(reference.max, 9.0);
    assert_eq!(reference.avg, 2.0);
    for sensor_id in [2, 3] {
        let stats = store.get_day(day(4), sensor_id).await.expect("get_day").stats;
        assert_eq!(stats, reference);
    }
}

pub async fn scenario_range_bounds_and_order(store: &dyn BucketStore) {
    store.upsert(day(7), 1, 70.0).await.expect("upsert");
    store.upsert(day(2), 2, 22.0).await.expect("upsert");
    store.upsert(day(1), 2, 21.0).await.expect("upsert");
    store.upsert(day(6), 1, 16.0).await.expect("upsert");
    store.upsert(day(1), 1, 11.0).await.expect("upsert");
    store.upsert(day(31), 3, 1.0).await.expect("upsert");

    let period = Period::new(day(1), day(7)).expect("period");
    let keys: Vec<_> = store
        .query_range(period)
        .await
        .expect("query_range")
        .iter()
        .map(|bucket| (bucket.sensor_id, bucket.day))
        .collect();
    assert_eq!(
        keys,
        vec![(1, day(1)), (1, day(6)), (2, day(1)), (2, day(2))]
    );

    let just_the_end = Period::single_day(day(7)).expect("period");
    let tail = store.query_range(just_the_end).await.expect("query_range");
    assert_eq!(tail.len(), 1);
    assert_eq!(tail[0].stats, Aggregate::single(70.0));
}

pub async fn scenario_period_reports(engine: &AggregationEngine) {
    let store = engine.store();
    for d in [1, 2] {
        for sensor_id in [1, 2] {
            store.upsert(day(d), sensor_id, 1.0).await.expect("upsert");
        }
    }
    // Next week, outside [day1, day7).
    store.upsert(day(8), 1, 1.0).await.expect("upsert");
    store.upsert(day(8), 2, 1.0).await.expect("upsert");

    let period = Period::new(day(1), day(7)).expect("period");

    let total = engine.total_for_period(period).await.expect("total");
    assert_eq!(total.sensor_id, SensorScope::All);
    assert_eq!(total.period_start, day_start(day(1)));
    assert_eq!(total.period_end, day_start(day(7)));
    assert_eq!(total.stats, constant(4, 1.0));

    let per_sensor = engine
        .per_sensor_for_period(period)
        .await
        .expect("per sensor");
    assert_eq!(per_sensor.len(), 2);
    for (row, sensor_id) in per_sensor.iter().zip([1, 2]) {
        assert_eq!(row.sensor_id, SensorScope::Sensor(sensor_id));
        assert_eq!(row.period_start, day_start(day(1)));
        assert_eq!(row.period_end, day_start(day(7)));
        assert_eq!(row.stats, constant(2, 1.0));
    }

    let per_day = engine
        .per_sensor_and_day_for_period(period)
        .await
        .expect("per sensor and day");
    let shape: Vec<_> = per_day
        .iter()
        .map(|row| (row.sensor_id, row.period_start, row.period_end, row.stats))
        .collect();
    let row = |sensor_id, d: u32| {
        (
            SensorScope::Sensor(sensor_id),
            day_start(day(d)),
            day_start(day(d + 1)),
            constant(1, 1.0),
        )
    };
    assert_eq!(shape, vec![row(1, 1), row(1, 2), row(2, 1), row(2, 2)]);
}
