//! Incremental aggregation and space/time tiling engine for moving-object data.
//!
//! ```rust
//! use tessel::{TileGridBuilder, split_trajectory};
//! use tessel_types::TemporalPoint;
//! use geo::Point;
//! use std::time::{Duration, UNIX_EPOCH};
//!
//! let traj = vec![
//!     TemporalPoint::new(Point::new(0.2, 0.2), UNIX_EPOCH),
//!     TemporalPoint::new(Point::new(2.8, 1.4), UNIX_EPOCH + Duration::from_secs(120)),
//! ];
//!
//! let grid = TileGridBuilder::new()
//!     .x_size(1.0)
//!     .y_size(1.0)
//!     .time_step(Duration::from_secs(60))
//!     .use_bit_matrix(true);
//! let fragments = split_trajectory(&traj, &grid)?;
//! # Ok::<(), tessel::TesselError>(())
//! ```

pub mod agg;
pub mod bitmatrix;
pub mod boxarray;
pub mod config;
pub mod error;
pub mod ffi;
pub mod split;
pub mod tile;

pub use config::{DEFAULT_ALLOC_CEILING, DEFAULT_INITIAL_CAPACITY, EngineConfig};
pub use error::{Result, TesselError};

pub use geo::{Point, Rect};

pub use agg::{
    AggregateKind, AggregateMeta, AggregateState, BucketSpec, CentroidState, CentroidTrack,
    CountState, ExtentState, UnionState,
};

pub use bitmatrix::BitMatrix;
pub use boxarray::{BoxArray, GrowthPolicy};
pub use split::{restrict_to_tile, restrict_to_tile_3d, split_trajectory, split_trajectory_3d};
pub use tile::{BorderFlags, Tile, TileGrid, TileGridBuilder, TileGridState};

pub use tessel_types::{
    BoxKind, STBox, SpatialBox2D, SpatialBox3D, TemporalPoint, TemporalPoint3D, TimeSpan,
    Trajectory, Trajectory3D,
};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{EngineConfig, Result, TesselError};

    pub use geo::{Point, Rect};

    pub use crate::{BoxArray, GrowthPolicy};

    pub use crate::{Tile, TileGridBuilder, TileGridState};

    pub use crate::{AggregateState, BucketSpec, CountState, ExtentState};

    pub use crate::{split_trajectory, split_trajectory_3d};

    pub use tessel_types::{STBox, TemporalPoint, TemporalPoint3D, TimeSpan};

    pub use std::time::Duration;
}
