use super::{BucketStore, StoreResult};
use crate::model::{Aggregate, Bucket, BucketKey, Period, SensorId};
use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::BuildHasher;

const DEFAULT_SHARDS: usize = 64;

type Shard = Mutex<HashMap<BucketKey, Aggregate>>;

/// In-process bucket store.
///
/// Every key maps to exactly one shard, and the fold for a key runs entirely under
/// that shard's lock with no await point, so a write is never observed half-applied
/// and never lost to a concurrent writer.
pub struct MemoryBucketStore {
    shards: Box<[Shard]>,
    hasher: RandomState,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::with_shards(DEFAULT_SHARDS)
    }

    pub fn with_shards(shards: usize) -> Self {
        let shards = shards.max(1);
        Self {
            shards: (0..shards).map(|_| Mutex::new(HashMap::new())).collect(),
            hasher: RandomState::new(),
        }
    }

    fn shard(&self, key: &BucketKey) -> &Shard {
        let index = self.hasher.hash_one(key) as usize % self.shards.len();
        &self.shards[index]
    }
}

impl Default for MemoryBucketStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn upsert(&self, day: NaiveDate, sensor_id: SensorId, value: f64) -> StoreResult<()> {
        let key = BucketKey { sensor_id, day };
        let mut shard = self.shard(&key).lock();
        shard.entry(key).or_insert(Aggregate::EMPTY).absorb(value);
        Ok(())
    }

    async fn get_day(&self, day: NaiveDate, sensor_id: SensorId) -> StoreResult<Bucket> {
        let key = BucketKey { sensor_id, day };
        let stats = self
            .shard(&key)
            .lock()
            .get(&key)
            .copied()
            .unwrap_or(Aggregate::EMPTY);
        Ok(Bucket {
            day,
            sensor_id,
            stats,
        })
    }

    // Each shard lock is held only while that shard's in-range entries are copied out;
    // a writer to the shard waits for at most that copy, never for the whole report.
    async fn query_range(&self, period: Period) -> StoreResult<Vec<Bucket>> {
        let mut copied: Vec<(BucketKey, Aggregate)> = Vec::new();
        for shard in self.shards.iter() {
            let guard = shard.lock();
            copied.extend(
                guard
                    .iter()
                    .filter(|(key, _)| period.contains(key.day))
                    .map(|(key, stats)| (*key, *stats)),
            );
        }

        copied.sort_unstable_by_key(|(key, _)| *key);
        let buckets = copied
            .into_iter()
            .map(|(key, stats)| Bucket {
                day: key.day,
                sensor_id: key.sensor_id,
                stats,
            })
            .collect();
        Ok(buckets)
    }

    async fn reset(&self) -> StoreResult<()> {
        for shard in self.shards.iter() {
            shard.lock().clear();
        }
        tracing::debug!("memory bucket store reset");
        Ok(())
    }
}
