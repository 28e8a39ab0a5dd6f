//! # tessel-types
//!
//! Core moving-object data types for the Tessel tiling and aggregation
//! engine.
//!
//! This crate provides the fundamental value types the engine operates on:
//!
//! - **Point types**: `TemporalPoint`, `TemporalPoint3D`
//! - **Trajectory types**: `Trajectory`, `Trajectory3D`
//! - **Bounding types**: `STBox` and its parts (`SpatialBox2D`,
//!   `SpatialBox3D`, `TimeSpan`, `BoxKind`)
//!
//! All types are serializable with Serde and built on top of the `geo`
//! crate's geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use tessel_types::point::TemporalPoint;
//! use geo::Point;
//! use std::time::SystemTime;
//!
//! let point = Point::new(-74.0060, 40.7128); // NYC coordinates
//! let temporal_point = TemporalPoint::new(point, SystemTime::now());
//! ```

pub mod bbox;
pub mod point;
pub mod trajectory;

pub use bbox::{BoxKind, STBox, SpatialBox2D, SpatialBox3D, TimeSpan};
pub use point::{TemporalPoint, TemporalPoint3D};
pub use trajectory::{Trajectory, Trajectory3D, extent, extent_3d};
