use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub type SensorId = i32;

#[derive(Debug, Error, PartialEq)]
pub enum InputError {
    #[error("period start {start} must be before end {end}")]
    EmptyPeriod { start: NaiveDate, end: NaiveDate },
    #[error("reading value must be finite, got {0}")]
    NonFiniteValue(f64),
    #[error("day {0} cannot be shifted by the requested amount")]
    DayOutOfRange(NaiveDate),
}

/// Running aggregate over a set of readings.
///
/// `avg` is always derived from `sum / count`; an empty aggregate reports every
/// numeric field as zero.
///
/// Wire keys follow the reporting API consumed by existing dashboards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Aggregate {
    #[serde(rename = "TotalCount")]
    pub count: i64,
    #[serde(rename = "TotalSum")]
    pub sum: f64,
    #[serde(rename = "AvgValue")]
    pub avg: f64,
    #[serde(rename = "MinValue")]
    pub min: f64,
    #[serde(rename = "MaxValue")]
    pub max: f64,
}

impl Aggregate {
    pub const EMPTY: Aggregate = Aggregate {
        count: 0,
        sum: 0.0,
        avg: 0.0,
        min: 0.0,
        max: 0.0,
    };

    pub fn single(value: f64) -> Self {
        Self {
            count: 1,
            sum: value,
            avg: value,
            min: value,
            max: value,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Folds one reading in, the same transition the storage upsert applies.
    pub fn absorb(&mut self, value: f64) {
        if self.is_empty() {
            *self = Self::single(value);
            return;
        }
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.avg = self.sum / self.count as f64;
    }

    /// Combines two aggregates without access to the readings behind them.
    pub fn merge(&mut self, other: &Aggregate) {
        if other.is_empty() {
            return;
        }
        if self.is_empty() {
            *self = *other;
            return;
        }
        self.count += other.count;
        self.sum += other.sum;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.avg = self.sum / self.count as f64;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BucketKey {
    pub sensor_id: SensorId,
    pub day: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bucket {
    pub day: NaiveDate,
    pub sensor_id: SensorId,
    #[serde(flatten)]
    pub stats: Aggregate,
}

impl Bucket {
    pub fn empty(day: NaiveDate, sensor_id: SensorId) -> Self {
        Self {
            day,
            sensor_id,
            stats: Aggregate::EMPTY,
        }
    }

    pub fn key(&self) -> BucketKey {
        BucketKey {
            sensor_id: self.sensor_id,
            day: self.day,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub sensor_id: SensorId,
    pub time: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(sensor_id: SensorId, time: DateTime<Utc>, value: f64) -> Result<Self, InputError> {
        if !value.is_finite() {
            return Err(InputError::NonFiniteValue(value));
        }
        Ok(Self {
            sensor_id,
            time,
            value,
        })
    }

    pub fn day(&self) -> NaiveDate {
        self.time.date_naive()
    }
}

/// Half-open range of calendar days, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    start: NaiveDate,
    end: NaiveDate,
}

impl Period {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InputError> {
        if start >= end {
            return Err(InputError::EmptyPeriod { start, end });
        }
        Ok(Self { start, end })
    }

    pub fn single_day(day: NaiveDate) -> Result<Self, InputError> {
        let end = next_day(day)?;
        Ok(Self { start: day, end })
    }

    pub fn trailing_days(today: NaiveDate, days: u64) -> Result<Self, InputError> {
        let start = today
            .checked_sub_days(Days::new(days))
            .ok_or(InputError::DayOutOfRange(today))?;
        Self::new(start, today)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.start && day < self.end
    }
}

pub fn next_day(day: NaiveDate) -> Result<NaiveDate, InputError> {
    day.checked_add_days(Days::new(1))
        .ok_or(InputError::DayOutOfRange(day))
}

pub fn day_start(day: NaiveDate) -> DateTime<Utc> {
    day.and_time(chrono::NaiveTime::MIN).and_utc()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorScope {
    All,
    Sensor(SensorId),
}

impl Serialize for SensorScope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SensorScope::All => serializer.serialize_str("all"),
            SensorScope::Sensor(id) => serializer.serialize_i32(*id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PeriodAggregate {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub sensor_id: SensorScope,
    #[serde(flatten)]
    pub stats: Aggregate,
}
