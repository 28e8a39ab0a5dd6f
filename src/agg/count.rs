//! Temporal-count aggregate: observations per fixed-width time bucket.

use super::{AggregateMeta, AggregateState};
use crate::error::{Result, TesselError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, SystemTime};
use tessel_types::TemporalPoint;

/// Fixed-width time bucketing: origin plus bucket width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketSpec {
    pub origin: SystemTime,
    pub width: Duration,
}

impl BucketSpec {
    pub fn new(origin: SystemTime, width: Duration) -> Result<Self> {
        if width.is_zero() {
            return Err(TesselError::Configuration(
                "bucket width must be positive".to_string(),
            ));
        }
        Ok(Self { origin, width })
    }

    /// Bucket index of an instant. Instants before the origin are refused.
    pub fn index_of(&self, at: SystemTime) -> Result<u64> {
        let elapsed = at
            .duration_since(self.origin)
            .map_err(|_| TesselError::InvalidTimestamp)?;
        Ok((elapsed.as_nanos() / self.width.as_nanos()) as u64)
    }

    /// Start instant of a bucket.
    pub fn start_of(&self, index: u64) -> SystemTime {
        let nanos = self.width.as_nanos() * index as u128;
        self.origin
            + Duration::new(
                (nanos / 1_000_000_000) as u64,
                (nanos % 1_000_000_000) as u32,
            )
    }
}

/// Partial state of the temporal count aggregate.
///
/// Entries stay keyed and ordered by bucket, so finalization emits the
/// stepwise count function directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountState {
    meta: AggregateMeta,
    bucket: BucketSpec,
    buckets: BTreeMap<u64, u64>,
}

impl CountState {
    /// Incorporate the instants of one value.
    pub fn fold(state: Option<Self>, points: &[TemporalPoint], bucket: BucketSpec) -> Result<Self> {
        let mut state = match state {
            None => Self {
                meta: AggregateMeta::count(bucket.origin, bucket.width),
                bucket,
                buckets: BTreeMap::new(),
            },
            Some(state) => {
                state
                    .meta
                    .ensure_compatible(&AggregateMeta::count(bucket.origin, bucket.width))?;
                state
            }
        };
        // Validate every instant before touching the buckets, so a bad
        // observation leaves the state as it was.
        let indices = points
            .iter()
            .map(|point| bucket.index_of(point.timestamp))
            .collect::<Result<Vec<_>>>()?;
        for index in indices {
            *state.buckets.entry(index).or_insert(0) += 1;
        }
        Ok(state)
    }

    pub fn bucket_spec(&self) -> BucketSpec {
        self.bucket
    }
}

impl AggregateState for CountState {
    /// Stepwise count: `(bucket start, observations)` in time order.
    type Output = Vec<(SystemTime, u64)>;

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        for (index, count) in other.buckets {
            *self.buckets.entry(index).or_insert(0) += count;
        }
        Ok(())
    }

    fn finalize(self) -> Vec<(SystemTime, u64)> {
        let spec = self.bucket_spec();
        self.buckets
            .into_iter()
            .map(|(index, count)| (spec.start_of(index), count))
            .collect()
    }
}
