//! Mergeable partial-aggregate states.
//!
//! Each aggregate accumulates a commutative, associative summary over a
//! stream of temporal values. Independent workers fold their own partitions
//! into private states; a coordinator merges those states pairwise with
//! [`AggregateState::combine`] in any order and grouping, then collapses
//! the survivor once with [`AggregateState::finalize`].
//!
//! The empty state is `Option::None` and acts as the identity of `combine`.

mod centroid;
mod count;
mod extent;
mod union;

pub use centroid::{CentroidState, CentroidTrack};
pub use count::{BucketSpec, CountState};
pub use extent::ExtentState;
pub use union::UnionState;

use crate::error::{Result, TesselError};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};
use tessel_types::BoxKind;

/// Which aggregate a partial state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateKind {
    Extent,
    Count,
    Union,
    Centroid,
}

/// Metadata identifying what a partial state aggregates.
///
/// Two states may only merge when their metadata agree exactly; anything
/// else is a caller error, refused before any entry is touched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateMeta {
    pub kind: AggregateKind,
    /// Shape of the accumulated boxes (extent aggregate).
    pub box_kind: Option<BoxKind>,
    /// Whether contributions carry a Z coordinate (centroid aggregate).
    pub has_z: bool,
    /// Spatial reference of the contributions, if any.
    pub srid: Option<i32>,
    /// Time bucketing (count aggregate).
    pub bucket: Option<(SystemTime, Duration)>,
}

impl AggregateMeta {
    fn bare(kind: AggregateKind) -> Self {
        Self {
            kind,
            box_kind: None,
            has_z: false,
            srid: None,
            bucket: None,
        }
    }

    pub(crate) fn extent(box_kind: BoxKind, srid: Option<i32>) -> Self {
        Self {
            box_kind: Some(box_kind),
            has_z: box_kind.has_z(),
            srid,
            ..Self::bare(AggregateKind::Extent)
        }
    }

    pub(crate) fn count(origin: SystemTime, width: Duration) -> Self {
        Self {
            bucket: Some((origin, width)),
            ..Self::bare(AggregateKind::Count)
        }
    }

    pub(crate) fn union() -> Self {
        Self::bare(AggregateKind::Union)
    }

    pub(crate) fn centroid(has_z: bool) -> Self {
        Self {
            has_z,
            ..Self::bare(AggregateKind::Centroid)
        }
    }

    pub fn ensure_compatible(&self, other: &AggregateMeta) -> Result<()> {
        if self != other {
            return Err(TesselError::IncompatibleStates(format!(
                "aggregate metadata disagree: {:?} vs {:?}",
                self, other
            )));
        }
        Ok(())
    }
}

/// The mergeable-aggregate protocol.
///
/// `combine` is commutative and associative, with `None` as identity, so a
/// coordinator may merge partial states in whatever order its workers
/// happen to finish.
pub trait AggregateState: Sized {
    type Output;

    fn meta(&self) -> &AggregateMeta;

    /// Merge `other` into `self`. Metadata have already been verified
    /// compatible.
    fn merge(&mut self, other: Self) -> Result<()>;

    /// Collapse the accumulated structure into its concrete output.
    fn finalize(self) -> Self::Output;

    /// Merge two partial states; either side may be empty.
    fn combine(a: Option<Self>, b: Option<Self>) -> Result<Option<Self>> {
        match (a, b) {
            (None, None) => Ok(None),
            (Some(state), None) | (None, Some(state)) => Ok(Some(state)),
            (Some(mut a), Some(b)) => {
                a.meta().ensure_compatible(b.meta())?;
                a.merge(b)?;
                Ok(Some(a))
            }
        }
    }
}

/// Encode a partial state for hand-off to a combining coordinator.
#[cfg(feature = "transport")]
pub fn encode_state<S: Serialize>(state: &S) -> Result<Vec<u8>> {
    bincode::serialize(state).map_err(|e| TesselError::Serialization(e.to_string()))
}

/// Decode a partial state received from a worker.
#[cfg(feature = "transport")]
pub fn decode_state<S: serde::de::DeserializeOwned>(bytes: &[u8]) -> Result<S> {
    bincode::deserialize(bytes).map_err(|e| TesselError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meta_compatibility() {
        let a = AggregateMeta::union();
        let b = AggregateMeta::union();
        assert!(a.ensure_compatible(&b).is_ok());

        let c = AggregateMeta::centroid(true);
        let err = a.ensure_compatible(&c).unwrap_err();
        assert!(matches!(err, TesselError::IncompatibleStates(_)));
    }

    #[test]
    fn test_extent_meta_tracks_dimensionality() {
        let flat = AggregateMeta::extent(BoxKind::Spatial2D, None);
        let tall = AggregateMeta::extent(BoxKind::Spatial3D, None);
        assert!(!flat.has_z);
        assert!(tall.has_z);
        assert!(flat.ensure_compatible(&tall).is_err());
    }
}
