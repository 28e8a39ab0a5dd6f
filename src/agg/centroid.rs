//! Time-varying centroid aggregate.
//!
//! Accumulates a weighted coordinate sum per time point; the division
//! happens once at finalize, so partial sums from independent workers add
//! up exactly.

use super::{AggregateMeta, AggregateState};
use crate::error::{Result, TesselError};
use geo::Point;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::SystemTime;
use tessel_types::{TemporalPoint, TemporalPoint3D};

/// Accumulated coordinate sums and weight at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub weight: f64,
}

impl WeightedPosition {
    fn add(&mut self, x: f64, y: f64, z: f64) {
        self.x += x;
        self.y += y;
        self.z += z;
        self.weight += 1.0;
    }
}

/// Partial state of the centroid aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentroidState {
    meta: AggregateMeta,
    entries: BTreeMap<SystemTime, WeightedPosition>,
}

/// The finalized centroid track.
#[derive(Debug, Clone, PartialEq)]
pub enum CentroidTrack {
    Planar(Vec<TemporalPoint>),
    Spatial3D(Vec<TemporalPoint3D>),
}

impl CentroidState {
    fn empty(has_z: bool) -> Self {
        Self {
            meta: AggregateMeta::centroid(has_z),
            entries: BTreeMap::new(),
        }
    }

    fn check_dimensionality(state: Self, has_z: bool) -> Result<Self> {
        if state.meta.has_z != has_z {
            return Err(TesselError::IncompatibleStates(
                "cannot mix 2D and 3D centroid contributions".to_string(),
            ));
        }
        Ok(state)
    }

    /// Incorporate the observations of one 2D value.
    pub fn fold(state: Option<Self>, points: &[TemporalPoint]) -> Result<Self> {
        let mut state = match state {
            None => Self::empty(false),
            Some(state) => Self::check_dimensionality(state, false)?,
        };
        for point in points {
            state
                .entries
                .entry(point.timestamp)
                .or_insert(WeightedPosition {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    weight: 0.0,
                })
                .add(point.x(), point.y(), 0.0);
        }
        Ok(state)
    }

    /// Incorporate the observations of one 3D value.
    pub fn fold_3d(state: Option<Self>, points: &[TemporalPoint3D]) -> Result<Self> {
        let mut state = match state {
            None => Self::empty(true),
            Some(state) => Self::check_dimensionality(state, true)?,
        };
        for point in points {
            state
                .entries
                .entry(point.timestamp)
                .or_insert(WeightedPosition {
                    x: 0.0,
                    y: 0.0,
                    z: 0.0,
                    weight: 0.0,
                })
                .add(point.x(), point.y(), point.altitude);
        }
        Ok(state)
    }

    /// Number of distinct instants accumulated.
    pub fn instant_count(&self) -> usize {
        self.entries.len()
    }
}

impl AggregateState for CentroidState {
    type Output = CentroidTrack;

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        for (at, pos) in other.entries {
            self.entries
                .entry(at)
                .and_modify(|acc| {
                    acc.x += pos.x;
                    acc.y += pos.y;
                    acc.z += pos.z;
                    acc.weight += pos.weight;
                })
                .or_insert(pos);
        }
        Ok(())
    }

    fn finalize(self) -> CentroidTrack {
        if self.meta.has_z {
            CentroidTrack::Spatial3D(
                self.entries
                    .into_iter()
                    .map(|(at, pos)| {
                        TemporalPoint3D::new(
                            Point::new(pos.x / pos.weight, pos.y / pos.weight),
                            pos.z / pos.weight,
                            at,
                        )
                    })
                    .collect(),
            )
        } else {
            CentroidTrack::Planar(
                self.entries
                    .into_iter()
                    .map(|(at, pos)| {
                        TemporalPoint::new(Point::new(pos.x / pos.weight, pos.y / pos.weight), at)
                    })
                    .collect(),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn ts(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn point(x: f64, y: f64, secs: u64) -> TemporalPoint {
        TemporalPoint::new(Point::new(x, y), ts(secs))
    }

    #[test]
    fn test_centroid_is_weighted_mean_per_instant() {
        let state = CentroidState::fold(None, &[point(0.0, 0.0, 10)]).unwrap();
        let state = CentroidState::fold(Some(state), &[point(4.0, 2.0, 10)]).unwrap();
        let state = CentroidState::fold(Some(state), &[point(8.0, 1.0, 20)]).unwrap();
        match state.finalize() {
            CentroidTrack::Planar(track) => {
                assert_eq!(track.len(), 2);
                assert_eq!(track[0], point(2.0, 1.0, 10));
                assert_eq!(track[1], point(8.0, 1.0, 20));
            }
            CentroidTrack::Spatial3D(_) => panic!("planar fold must finalize planar"),
        }
    }

    #[test]
    fn test_track_is_time_ordered() {
        let state =
            CentroidState::fold(None, &[point(1.0, 1.0, 30), point(2.0, 2.0, 10)]).unwrap();
        match state.finalize() {
            CentroidTrack::Planar(track) => {
                assert_eq!(track[0].timestamp, ts(10));
                assert_eq!(track[1].timestamp, ts(30));
            }
            CentroidTrack::Spatial3D(_) => unreachable!(),
        }
    }

    #[test]
    fn test_combine_equals_unpartitioned_fold() {
        let all = [
            point(0.0, 0.0, 10),
            point(4.0, 4.0, 10),
            point(2.0, 6.0, 20),
            point(6.0, 2.0, 20),
        ];
        let whole = CentroidState::fold(None, &all).unwrap();

        let a = CentroidState::fold(None, &all[..2]).unwrap();
        let b = CentroidState::fold(None, &all[2..]).unwrap();
        let merged = CentroidState::combine(Some(a), Some(b)).unwrap().unwrap();

        assert_eq!(whole.finalize(), merged.finalize());
    }

    #[test]
    fn test_mixed_dimensionality_rejected() {
        let planar = CentroidState::fold(None, &[point(0.0, 0.0, 10)]).unwrap();
        let tall = vec![TemporalPoint3D::new(Point::new(0.0, 0.0), 5.0, ts(10))];
        assert!(CentroidState::fold_3d(Some(planar.clone()), &tall).is_err());

        let spatial = CentroidState::fold_3d(None, &tall).unwrap();
        assert!(CentroidState::combine(Some(planar), Some(spatial)).is_err());
    }

    #[test]
    fn test_3d_centroid_divides_altitude() {
        let points = vec![
            TemporalPoint3D::new(Point::new(0.0, 0.0), 10.0, ts(5)),
            TemporalPoint3D::new(Point::new(2.0, 2.0), 30.0, ts(5)),
        ];
        let state = CentroidState::fold_3d(None, &points).unwrap();
        match state.finalize() {
            CentroidTrack::Spatial3D(track) => {
                assert_eq!(track.len(), 1);
                assert_eq!(track[0].x(), 1.0);
                assert_eq!(track[0].altitude, 20.0);
            }
            CentroidTrack::Planar(_) => panic!("3D fold must finalize 3D"),
        }
    }
}
