//! Regular space/time grids and the resumable tile iterator.
//!
//! A [`TileGrid`] describes a regular grid of up to four dimensions (X, Y,
//! Z, T) over the extent of a moving-object value. [`TileGridState`] walks
//! every cell of that grid lazily, odometer-style, optionally skipping
//! cells the value never touches via a [`BitMatrix`]. States are built with
//! [`TileGridBuilder`].

use crate::bitmatrix::{BitMatrix, Coords};
use crate::config::EngineConfig;
use crate::error::{Result, TesselError};
use geo::Point;
use smallvec::SmallVec;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessel_types::{STBox, SpatialBox2D, SpatialBox3D, TemporalPoint, TemporalPoint3D, TimeSpan};

/// A spatial grid dimension: origin, cell size, cell count.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpaceAxis {
    pub origin: f64,
    pub size: f64,
    pub count: usize,
}

impl SpaceAxis {
    fn new(extent_max: f64, origin: f64, size: f64) -> Self {
        let cells = ((extent_max - origin) / size).ceil();
        let count = if cells.is_finite() && cells > 0.0 {
            cells as usize
        } else {
            1
        };
        Self {
            origin,
            size,
            count,
        }
    }

    fn cell_of(&self, value: f64) -> usize {
        let cell = ((value - self.origin) / self.size).floor();
        if cell.is_finite() && cell > 0.0 {
            (cell as usize).min(self.count - 1)
        } else {
            0
        }
    }

    fn lower(&self, coord: usize) -> f64 {
        self.origin + coord as f64 * self.size
    }
}

/// The temporal grid dimension: origin, step, cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    pub origin: SystemTime,
    pub step: Duration,
    pub count: usize,
}

impl TimeAxis {
    fn new(extent_end: SystemTime, origin: SystemTime, step: Duration) -> Self {
        let nanos = extent_end
            .duration_since(origin)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let count = nanos.div_ceil(step.as_nanos()).max(1) as usize;
        Self {
            origin,
            step,
            count,
        }
    }

    fn cell_of(&self, at: SystemTime) -> usize {
        match at.duration_since(self.origin) {
            Ok(elapsed) => {
                ((elapsed.as_nanos() / self.step.as_nanos()) as usize).min(self.count - 1)
            }
            Err(_) => 0,
        }
    }

    fn lower(&self, coord: usize) -> SystemTime {
        self.origin + step_times(self.step, coord)
    }
}

fn step_times(step: Duration, n: usize) -> Duration {
    let nanos = step.as_nanos() * n as u128;
    Duration::new((nanos / 1_000_000_000) as u64, (nanos % 1_000_000_000) as u32)
}

/// Which dimension bounds of a tile are closed at the top.
///
/// Only the final cell of a dimension can be closed, and only when the grid
/// was built with `include_upper_border`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BorderFlags {
    pub x: bool,
    pub y: bool,
    pub z: bool,
    pub t: bool,
}

/// Grid geometry: the active dimensions and the border convention.
#[derive(Debug, Clone, PartialEq)]
pub struct TileGrid {
    x: Option<SpaceAxis>,
    y: Option<SpaceAxis>,
    z: Option<SpaceAxis>,
    t: Option<TimeAxis>,
    srid: Option<i32>,
    include_upper_border: bool,
}

impl TileGrid {
    pub fn x_axis(&self) -> Option<&SpaceAxis> {
        self.x.as_ref()
    }

    pub fn y_axis(&self) -> Option<&SpaceAxis> {
        self.y.as_ref()
    }

    pub fn z_axis(&self) -> Option<&SpaceAxis> {
        self.z.as_ref()
    }

    pub fn time_axis(&self) -> Option<&TimeAxis> {
        self.t.as_ref()
    }

    pub fn srid(&self) -> Option<i32> {
        self.srid
    }

    pub fn include_upper_border(&self) -> bool {
        self.include_upper_border
    }

    /// Cell counts of the active dimensions, least significant (X) first.
    pub fn counts(&self) -> Coords {
        let mut counts: Coords = SmallVec::new();
        if let Some(axis) = &self.x {
            counts.push(axis.count);
        }
        if let Some(axis) = &self.y {
            counts.push(axis.count);
        }
        if let Some(axis) = &self.z {
            counts.push(axis.count);
        }
        if let Some(axis) = &self.t {
            counts.push(axis.count);
        }
        counts
    }

    /// Total number of grid cells.
    pub fn total_tiles(&self) -> usize {
        self.counts().iter().product()
    }

    /// Inclusive per-dimension cell ranges spanned by a segment extent,
    /// in the same dimension order as `counts()`.
    fn segment_ranges(&self, seg: &SegmentSpan) -> SmallVec<[(usize, usize); 4]> {
        let mut ranges: SmallVec<[(usize, usize); 4]> = SmallVec::new();
        if let Some(axis) = &self.x {
            ranges.push((axis.cell_of(seg.x.0), axis.cell_of(seg.x.1)));
        }
        if let Some(axis) = &self.y {
            ranges.push((axis.cell_of(seg.y.0), axis.cell_of(seg.y.1)));
        }
        if let Some(axis) = &self.z {
            let (lo, hi) = seg.z.unwrap_or((axis.origin, axis.origin));
            ranges.push((axis.cell_of(lo), axis.cell_of(hi)));
        }
        if let Some(axis) = &self.t {
            ranges.push((axis.cell_of(seg.t.0), axis.cell_of(seg.t.1)));
        }
        ranges
    }

    fn tile_at(&self, coords: &[usize]) -> Tile {
        let mut dim = 0;
        let mut next = || {
            let c = coords[dim];
            dim += 1;
            c
        };
        let mut upper_inc = BorderFlags::default();
        let space_2d = self.x.as_ref().zip(self.y.as_ref()).map(|(x, y)| {
            let cx = next();
            let cy = next();
            upper_inc.x = self.include_upper_border && cx + 1 == x.count;
            upper_inc.y = self.include_upper_border && cy + 1 == y.count;
            (
                x.lower(cx),
                y.lower(cy),
                x.lower(cx) + x.size,
                y.lower(cy) + y.size,
            )
        });
        let z_span = self.z.as_ref().map(|z| {
            let cz = next();
            upper_inc.z = self.include_upper_border && cz + 1 == z.count;
            (z.lower(cz), z.lower(cz) + z.size)
        });
        let time = self.t.as_ref().map(|t| {
            let ct = next();
            upper_inc.t = self.include_upper_border && ct + 1 == t.count;
            TimeSpan::new(t.lower(ct), t.lower(ct + 1))
        });

        let bbox = match (space_2d, z_span, time) {
            (None, None, Some(span)) => STBox::Time(span),
            (Some((min_x, min_y, max_x, max_y)), None, time) => {
                let mut space = SpatialBox2D::new(min_x, min_y, max_x, max_y);
                space.srid = self.srid;
                match time {
                    None => STBox::Spatial2D(space),
                    Some(span) => STBox::SpatioTemporal2D { space, time: span },
                }
            }
            (Some((min_x, min_y, max_x, max_y)), Some((min_z, max_z)), time) => {
                let mut space = SpatialBox3D::new(min_x, min_y, min_z, max_x, max_y, max_z);
                space.srid = self.srid;
                match time {
                    None => STBox::Spatial3D(space),
                    Some(span) => STBox::SpatioTemporal3D { space, time: span },
                }
            }
            _ => unreachable!("builder guarantees at least one active dimension"),
        };

        Tile {
            coords: SmallVec::from_slice(coords),
            bbox,
            upper_inc,
        }
    }
}

/// One materialized grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    coords: Coords,
    bbox: STBox,
    upper_inc: BorderFlags,
}

fn axis_contains(lo: f64, hi: f64, inc: bool, value: f64) -> bool {
    value >= lo && (value < hi || (inc && value == hi))
}

impl Tile {
    /// Grid coordinates of this cell, least significant dimension first.
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    pub fn bbox(&self) -> &STBox {
        &self.bbox
    }

    pub fn upper_inc(&self) -> BorderFlags {
        self.upper_inc
    }

    /// Whether a 2D observation falls inside this tile.
    ///
    /// Bounds are half-open; the final cell of a dimension is closed when
    /// the grid asked for the upper border. Tiles of a Z-aware grid never
    /// contain a 2D observation.
    pub fn contains_point(&self, point: &TemporalPoint) -> bool {
        if self.bbox.has_z() {
            return false;
        }
        self.contains_raw(point.x(), point.y(), None, point.timestamp)
    }

    /// Whether a 3D observation falls inside this tile.
    ///
    /// Grids without a Z dimension leave altitude unconstrained.
    pub fn contains_point_3d(&self, point: &TemporalPoint3D) -> bool {
        self.contains_raw(point.x(), point.y(), Some(point.altitude), point.timestamp)
    }

    fn contains_raw(&self, x: f64, y: f64, z: Option<f64>, at: SystemTime) -> bool {
        if let (Some(lo), Some(hi)) = (self.bbox.min_x(), self.bbox.max_x()) {
            if !axis_contains(lo, hi, self.upper_inc.x, x) {
                return false;
            }
        }
        if let (Some(lo), Some(hi)) = (self.bbox.min_y(), self.bbox.max_y()) {
            if !axis_contains(lo, hi, self.upper_inc.y, y) {
                return false;
            }
        }
        if let (Some(lo), Some(hi)) = (self.bbox.min_z(), self.bbox.max_z()) {
            match z {
                Some(z) => {
                    if !axis_contains(lo, hi, self.upper_inc.z, z) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        if let Some(span) = self.bbox.period() {
            if !span.contains(at, self.upper_inc.t) {
                return false;
            }
        }
        true
    }
}

/// Local extent of one trajectory segment (or lone instant).
#[derive(Debug, Clone, Copy)]
pub(crate) struct SegmentSpan {
    pub x: (f64, f64),
    pub y: (f64, f64),
    pub z: Option<(f64, f64)>,
    pub t: (SystemTime, SystemTime),
}

fn minmax(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}

fn minmax_time(a: SystemTime, b: SystemTime) -> (SystemTime, SystemTime) {
    if a <= b { (a, b) } else { (b, a) }
}

pub(crate) fn segment_spans(points: &[TemporalPoint]) -> Vec<SegmentSpan> {
    if points.len() == 1 {
        let p = &points[0];
        return vec![SegmentSpan {
            x: (p.x(), p.x()),
            y: (p.y(), p.y()),
            z: None,
            t: (p.timestamp, p.timestamp),
        }];
    }
    points
        .windows(2)
        .map(|pair| SegmentSpan {
            x: minmax(pair[0].x(), pair[1].x()),
            y: minmax(pair[0].y(), pair[1].y()),
            z: None,
            t: minmax_time(pair[0].timestamp, pair[1].timestamp),
        })
        .collect()
}

pub(crate) fn segment_spans_3d(points: &[TemporalPoint3D]) -> Vec<SegmentSpan> {
    if points.len() == 1 {
        let p = &points[0];
        return vec![SegmentSpan {
            x: (p.x(), p.x()),
            y: (p.y(), p.y()),
            z: Some((p.altitude, p.altitude)),
            t: (p.timestamp, p.timestamp),
        }];
    }
    points
        .windows(2)
        .map(|pair| SegmentSpan {
            x: minmax(pair[0].x(), pair[1].x()),
            y: minmax(pair[0].y(), pair[1].y()),
            z: Some(minmax(pair[0].altitude, pair[1].altitude)),
            t: minmax_time(pair[0].timestamp, pair[1].timestamp),
        })
        .collect()
}

/// Builder for tile grid states.
///
/// A dimension participates when its size is strictly positive and the
/// value's extent carries it; at least one dimension must end up active.
///
/// # Examples
///
/// ```rust
/// use tessel::TileGridBuilder;
/// use tessel_types::TemporalPoint;
/// use geo::Point;
/// use std::time::{Duration, UNIX_EPOCH};
///
/// let traj = vec![
///     TemporalPoint::new(Point::new(0.5, 0.5), UNIX_EPOCH),
///     TemporalPoint::new(Point::new(3.5, 1.5), UNIX_EPOCH + Duration::from_secs(90)),
/// ];
/// let state = TileGridBuilder::new()
///     .x_size(1.0)
///     .y_size(1.0)
///     .time_step(Duration::from_secs(60))
///     .build(&traj)?;
/// for tile in state {
///     // intersect the trajectory with tile.bbox()
/// }
/// # Ok::<(), tessel::TesselError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TileGridBuilder {
    x_size: f64,
    y_size: f64,
    z_size: f64,
    time_step: Option<Duration>,
    space_origin: Point<f64>,
    z_origin: f64,
    time_origin: SystemTime,
    use_bit_matrix: bool,
    include_upper_border: bool,
    config: EngineConfig,
}

impl TileGridBuilder {
    pub fn new() -> Self {
        Self {
            x_size: 0.0,
            y_size: 0.0,
            z_size: 0.0,
            time_step: None,
            space_origin: Point::new(0.0, 0.0),
            z_origin: 0.0,
            time_origin: UNIX_EPOCH,
            use_bit_matrix: false,
            include_upper_border: false,
            config: EngineConfig::default(),
        }
    }

    /// Tile width along X. Zero leaves the dimension out of the grid.
    pub fn x_size(mut self, size: f64) -> Self {
        self.x_size = size;
        self
    }

    /// Tile height along Y. Zero leaves the dimension out of the grid.
    pub fn y_size(mut self, size: f64) -> Self {
        self.y_size = size;
        self
    }

    /// Tile depth along Z. Only takes effect for values that carry Z.
    pub fn z_size(mut self, size: f64) -> Self {
        self.z_size = size;
        self
    }

    /// Temporal bucket width. `None` leaves time out of the grid.
    pub fn time_step(mut self, step: Duration) -> Self {
        self.time_step = Some(step);
        self
    }

    /// Lower-left grid origin in space. Defaults to `(0, 0)`.
    pub fn space_origin(mut self, origin: Point<f64>) -> Self {
        self.space_origin = origin;
        self
    }

    /// Grid origin along Z. Defaults to `0`.
    pub fn z_origin(mut self, origin: f64) -> Self {
        self.z_origin = origin;
        self
    }

    /// Temporal grid origin. Defaults to the Unix epoch.
    pub fn time_origin(mut self, origin: SystemTime) -> Self {
        self.time_origin = origin;
        self
    }

    /// Build a presence bit matrix so iteration skips tiles the value never
    /// touches.
    pub fn use_bit_matrix(mut self, enabled: bool) -> Self {
        self.use_bit_matrix = enabled;
        self
    }

    /// Close the upper bound of the final tile in every dimension.
    pub fn include_upper_border(mut self, enabled: bool) -> Self {
        self.include_upper_border = enabled;
        self
    }

    /// Use an explicit execution context (allocation ceiling).
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Build the grid state for a 2D trajectory.
    pub fn build(&self, points: &[TemporalPoint]) -> Result<TileGridState> {
        let extent = tessel_types::extent(points).ok_or_else(|| {
            TesselError::Configuration("cannot tile an empty value".to_string())
        })?;
        self.build_from(extent, segment_spans(points))
    }

    /// Build the grid state for a 3D trajectory.
    pub fn build_3d(&self, points: &[TemporalPoint3D]) -> Result<TileGridState> {
        let extent = tessel_types::extent_3d(points).ok_or_else(|| {
            TesselError::Configuration("cannot tile an empty value".to_string())
        })?;
        self.build_from(extent, segment_spans_3d(points))
    }

    fn validate_size(name: &str, size: f64) -> Result<()> {
        if size < 0.0 || !size.is_finite() {
            return Err(TesselError::Configuration(format!(
                "{name} tile size must be a non-negative finite number, got {size}"
            )));
        }
        Ok(())
    }

    fn build_from(&self, extent: STBox, segments: Vec<SegmentSpan>) -> Result<TileGridState> {
        Self::validate_size("x", self.x_size)?;
        Self::validate_size("y", self.y_size)?;
        Self::validate_size("z", self.z_size)?;

        if (self.x_size > 0.0) != (self.y_size > 0.0) {
            return Err(TesselError::Configuration(
                "x and y tile sizes must be given together".to_string(),
            ));
        }

        let spatial = self.x_size > 0.0 && extent.has_x();
        let x = if spatial {
            extent
                .max_x()
                .map(|max| SpaceAxis::new(max, self.space_origin.x(), self.x_size))
        } else {
            None
        };
        let y = if spatial {
            extent
                .max_y()
                .map(|max| SpaceAxis::new(max, self.space_origin.y(), self.y_size))
        } else {
            None
        };
        let z = if self.z_size > 0.0 {
            extent
                .max_z()
                .map(|max| SpaceAxis::new(max, self.z_origin, self.z_size))
        } else {
            None
        };
        let t = match self.time_step {
            Some(step) if !step.is_zero() => extent
                .period()
                .map(|period| TimeAxis::new(period.end, self.time_origin, step)),
            _ => None,
        };

        if x.is_none() && z.is_none() && t.is_none() {
            return Err(TesselError::Configuration(
                "at least one grid dimension must be active".to_string(),
            ));
        }

        let grid = TileGrid {
            x,
            y,
            z,
            t,
            srid: extent.srid(),
            include_upper_border: self.include_upper_border,
        };

        let matrix = if self.use_bit_matrix {
            let counts = grid.counts();
            let mut matrix = BitMatrix::make_with(&counts, self.config.alloc_ceiling_bytes)?;
            for seg in &segments {
                matrix.set_region(&grid.segment_ranges(seg));
            }
            log::debug!(
                "bit matrix marked {} of {} tiles",
                matrix.count_ones(),
                grid.total_tiles()
            );
            Some(matrix)
        } else {
            None
        };

        let mut state = TileGridState {
            coords: grid.counts().iter().map(|_| 0).collect(),
            done: false,
            grid,
            matrix,
        };
        state.skip_unmarked();
        Ok(state)
    }
}

impl Default for TileGridBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Resumable enumeration of every (touched) cell of a [`TileGrid`].
///
/// The state may be dropped at any point; a consumer that stops early loses
/// nothing but the remaining tiles.
#[derive(Debug, Clone)]
pub struct TileGridState {
    grid: TileGrid,
    coords: Coords,
    done: bool,
    matrix: Option<BitMatrix>,
}

impl TileGridState {
    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    /// Current coordinate vector, least significant dimension first.
    pub fn coords(&self) -> &[usize] {
        &self.coords
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// The cell the state currently points at, or `None` once exhausted.
    pub fn materialize(&self) -> Option<Tile> {
        if self.done {
            return None;
        }
        Some(self.grid.tile_at(&self.coords))
    }

    /// Odometer increment to the next cell; with a bit matrix attached,
    /// to the next marked cell.
    pub fn advance(&mut self) {
        if self.done {
            return;
        }
        self.advance_raw();
        self.skip_unmarked();
    }

    fn advance_raw(&mut self) {
        let counts = self.grid.counts();
        for dim in 0..self.coords.len() {
            self.coords[dim] += 1;
            if self.coords[dim] < counts[dim] {
                return;
            }
            self.coords[dim] = 0;
        }
        self.done = true;
    }

    fn skip_unmarked(&mut self) {
        while !self.done && !self.current_marked() {
            self.advance_raw();
        }
    }

    fn current_marked(&self) -> bool {
        self.matrix
            .as_ref()
            .is_none_or(|matrix| matrix.test_bit(&self.coords))
    }
}

impl Iterator for TileGridState {
    type Item = Tile;

    fn next(&mut self) -> Option<Tile> {
        let tile = self.materialize()?;
        self.advance();
        Some(tile)
    }
}
