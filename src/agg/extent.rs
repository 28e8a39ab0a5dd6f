//! Running-extent aggregate: the union of every contributed bounding box.

use super::{AggregateMeta, AggregateState};
use crate::error::{Result, TesselError};
use serde::{Deserialize, Serialize};
use tessel_types::STBox;

/// Partial state of the extent aggregate.
///
/// No ordering is involved; the state is a single box that only ever
/// widens, which makes `combine` trivially commutative and associative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtentState {
    meta: AggregateMeta,
    extent: STBox,
}

impl ExtentState {
    /// Incorporate one value's bounding box.
    pub fn fold(state: Option<Self>, bx: &STBox) -> Result<Self> {
        match state {
            None => Ok(Self {
                meta: AggregateMeta::extent(bx.kind(), bx.srid()),
                extent: bx.clone(),
            }),
            Some(mut state) => {
                state
                    .extent
                    .extend_to_include(bx)
                    .map_err(TesselError::IncompatibleStates)?;
                Ok(state)
            }
        }
    }

    /// The extent accumulated so far.
    pub fn current(&self) -> &STBox {
        &self.extent
    }
}

impl AggregateState for ExtentState {
    type Output = STBox;

    fn meta(&self) -> &AggregateMeta {
        &self.meta
    }

    fn merge(&mut self, other: Self) -> Result<()> {
        self.extent
            .extend_to_include(&other.extent)
            .map_err(TesselError::IncompatibleStates)
    }

    fn finalize(self) -> STBox {
        self.extent
    }
}
