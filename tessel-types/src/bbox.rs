use geo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// A half-open time interval `[start, end)`.
///
/// Degenerate spans (`start == end`) represent a single instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: SystemTime,
    pub end: SystemTime,
}

impl TimeSpan {
    /// Create a span covering both endpoints; arguments may be given in
    /// either order.
    pub fn new(a: SystemTime, b: SystemTime) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        Self { start, end }
    }

    /// A span holding a single instant.
    pub fn instant(at: SystemTime) -> Self {
        Self { start: at, end: at }
    }

    pub fn duration(&self) -> Duration {
        self.end
            .duration_since(self.start)
            .unwrap_or(Duration::ZERO)
    }

    /// Membership under the half-open convention; `upper_inc` additionally
    /// admits the end bound (and makes instant spans non-empty).
    pub fn contains(&self, at: SystemTime, upper_inc: bool) -> bool {
        at >= self.start && (at < self.end || (upper_inc && at == self.end))
    }

    /// Whether two spans overlap or share an endpoint, so their union is a
    /// single span.
    pub fn touches(&self, other: &TimeSpan) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Grow this span to cover `other`.
    pub fn extend_to_include(&mut self, other: &TimeSpan) {
        if other.start < self.start {
            self.start = other.start;
        }
        if other.end > self.end {
            self.end = other.end;
        }
    }
}

/// A 2D axis-aligned bounding box with an optional spatial reference id.
///
/// This is a wrapper around `geo::Rect` with additional functionality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialBox2D {
    /// The underlying geometric rectangle
    pub rect: Rect<f64>,
    /// Spatial reference identifier, if known
    pub srid: Option<i32>,
}

impl SpatialBox2D {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            rect: Rect::new(
                geo::coord! { x: min_x, y: min_y },
                geo::coord! { x: max_x, y: max_y },
            ),
            srid: None,
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn from_rect(rect: Rect<f64>) -> Self {
        Self { rect, srid: None }
    }

    pub fn min_x(&self) -> f64 {
        self.rect.min().x
    }

    pub fn min_y(&self) -> f64 {
        self.rect.min().y
    }

    pub fn max_x(&self) -> f64 {
        self.rect.max().x
    }

    pub fn max_y(&self) -> f64 {
        self.rect.max().y
    }

    pub fn center(&self) -> Point<f64> {
        Point::new(
            (self.min_x() + self.max_x()) / 2.0,
            (self.min_y() + self.max_y()) / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x() - self.min_x()
    }

    pub fn height(&self) -> f64 {
        self.max_y() - self.min_y()
    }

    /// Check if a point is contained within this box (closed bounds).
    pub fn contains_point(&self, point: &Point<f64>) -> bool {
        point.x() >= self.min_x()
            && point.x() <= self.max_x()
            && point.y() >= self.min_y()
            && point.y() <= self.max_y()
    }

    /// Check if this box intersects with another.
    pub fn intersects(&self, other: &SpatialBox2D) -> bool {
        !(self.max_x() < other.min_x()
            || self.min_x() > other.max_x()
            || self.max_y() < other.min_y()
            || self.min_y() > other.max_y())
    }

    /// Grow this box to cover `other`.
    pub fn extend_to_include(&mut self, other: &SpatialBox2D) {
        let min_x = self.min_x().min(other.min_x());
        let min_y = self.min_y().min(other.min_y());
        let max_x = self.max_x().max(other.max_x());
        let max_y = self.max_y().max(other.max_y());
        self.rect = Rect::new(
            geo::coord! { x: min_x, y: min_y },
            geo::coord! { x: max_x, y: max_y },
        );
    }
}

/// A 3D axis-aligned bounding box with an optional spatial reference id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpatialBox3D {
    pub min_x: f64,
    pub min_y: f64,
    /// Minimum z coordinate (altitude/elevation)
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Maximum z coordinate (altitude/elevation)
    pub max_z: f64,
    /// Spatial reference identifier, if known
    pub srid: Option<i32>,
}

impl SpatialBox3D {
    pub fn new(min_x: f64, min_y: f64, min_z: f64, max_x: f64, max_y: f64, max_z: f64) -> Self {
        Self {
            min_x,
            min_y,
            min_z,
            max_x,
            max_y,
            max_z,
            srid: None,
        }
    }

    pub fn with_srid(mut self, srid: i32) -> Self {
        self.srid = Some(srid);
        self
    }

    pub fn center(&self) -> (f64, f64, f64) {
        (
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
            (self.min_z + self.max_z) / 2.0,
        )
    }

    pub fn contains_point(&self, x: f64, y: f64, z: f64) -> bool {
        x >= self.min_x
            && x <= self.max_x
            && y >= self.min_y
            && y <= self.max_y
            && z >= self.min_z
            && z <= self.max_z
    }

    pub fn intersects(&self, other: &SpatialBox3D) -> bool {
        !(self.max_x < other.min_x
            || self.min_x > other.max_x
            || self.max_y < other.min_y
            || self.min_y > other.max_y
            || self.max_z < other.min_z
            || self.min_z > other.max_z)
    }

    /// Grow this box to cover `other`.
    pub fn extend_to_include(&mut self, other: &SpatialBox3D) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.min_z = self.min_z.min(other.min_z);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
        self.max_z = self.max_z.max(other.max_z);
    }

    /// Project to a 2D box (discarding z).
    pub fn to_2d(&self) -> SpatialBox2D {
        let mut flat = SpatialBox2D::new(self.min_x, self.min_y, self.max_x, self.max_y);
        flat.srid = self.srid;
        flat
    }
}

/// The shape of an [`STBox`]: which of the X/Y/Z/T dimensions it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoxKind {
    /// T only
    Time,
    /// X and Y
    Spatial2D,
    /// X, Y and Z
    Spatial3D,
    /// X, Y and T
    SpatioTemporal2D,
    /// X, Y, Z and T
    SpatioTemporal3D,
}

impl BoxKind {
    pub fn has_x(&self) -> bool {
        !matches!(self, BoxKind::Time)
    }

    pub fn has_z(&self) -> bool {
        matches!(self, BoxKind::Spatial3D | BoxKind::SpatioTemporal3D)
    }

    pub fn has_t(&self) -> bool {
        matches!(
            self,
            BoxKind::Time | BoxKind::SpatioTemporal2D | BoxKind::SpatioTemporal3D
        )
    }

    /// Nominal fixed record size of one box of this shape, in bytes.
    ///
    /// Each shape knows its own size; allocation accounting for box
    /// containers is based on these values.
    pub const fn encoded_size(&self) -> usize {
        match self {
            BoxKind::Time => 32,
            BoxKind::Spatial2D => 40,
            BoxKind::Spatial3D => 56,
            BoxKind::SpatioTemporal2D => 72,
            BoxKind::SpatioTemporal3D => 88,
        }
    }
}

/// A spatiotemporal bounding box: an axis-aligned extent over up to four
/// dimensions (X, Y, Z, T).
///
/// One variant per concrete shape; there is no "partially present"
/// representation. Spatial bounds are closed on both ends, the time span is
/// half-open (see [`TimeSpan`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum STBox {
    Time(TimeSpan),
    Spatial2D(SpatialBox2D),
    Spatial3D(SpatialBox3D),
    SpatioTemporal2D {
        space: SpatialBox2D,
        time: TimeSpan,
    },
    SpatioTemporal3D {
        space: SpatialBox3D,
        time: TimeSpan,
    },
}

impl STBox {
    pub fn kind(&self) -> BoxKind {
        match self {
            STBox::Time(_) => BoxKind::Time,
            STBox::Spatial2D(_) => BoxKind::Spatial2D,
            STBox::Spatial3D(_) => BoxKind::Spatial3D,
            STBox::SpatioTemporal2D { .. } => BoxKind::SpatioTemporal2D,
            STBox::SpatioTemporal3D { .. } => BoxKind::SpatioTemporal3D,
        }
    }

    pub fn has_x(&self) -> bool {
        self.kind().has_x()
    }

    pub fn has_z(&self) -> bool {
        self.kind().has_z()
    }

    pub fn has_t(&self) -> bool {
        self.kind().has_t()
    }

    pub fn srid(&self) -> Option<i32> {
        match self {
            STBox::Time(_) => None,
            STBox::Spatial2D(b) => b.srid,
            STBox::Spatial3D(b) => b.srid,
            STBox::SpatioTemporal2D { space, .. } => space.srid,
            STBox::SpatioTemporal3D { space, .. } => space.srid,
        }
    }

    pub fn period(&self) -> Option<&TimeSpan> {
        match self {
            STBox::Time(span) => Some(span),
            STBox::SpatioTemporal2D { time, .. } | STBox::SpatioTemporal3D { time, .. } => {
                Some(time)
            }
            _ => None,
        }
    }

    pub fn min_x(&self) -> Option<f64> {
        match self {
            STBox::Time(_) => None,
            STBox::Spatial2D(b) => Some(b.min_x()),
            STBox::Spatial3D(b) => Some(b.min_x),
            STBox::SpatioTemporal2D { space, .. } => Some(space.min_x()),
            STBox::SpatioTemporal3D { space, .. } => Some(space.min_x),
        }
    }

    pub fn max_x(&self) -> Option<f64> {
        match self {
            STBox::Time(_) => None,
            STBox::Spatial2D(b) => Some(b.max_x()),
            STBox::Spatial3D(b) => Some(b.max_x),
            STBox::SpatioTemporal2D { space, .. } => Some(space.max_x()),
            STBox::SpatioTemporal3D { space, .. } => Some(space.max_x),
        }
    }

    pub fn min_y(&self) -> Option<f64> {
        match self {
            STBox::Time(_) => None,
            STBox::Spatial2D(b) => Some(b.min_y()),
            STBox::Spatial3D(b) => Some(b.min_y),
            STBox::SpatioTemporal2D { space, .. } => Some(space.min_y()),
            STBox::SpatioTemporal3D { space, .. } => Some(space.min_y),
        }
    }

    pub fn max_y(&self) -> Option<f64> {
        match self {
            STBox::Time(_) => None,
            STBox::Spatial2D(b) => Some(b.max_y()),
            STBox::Spatial3D(b) => Some(b.max_y),
            STBox::SpatioTemporal2D { space, .. } => Some(space.max_y()),
            STBox::SpatioTemporal3D { space, .. } => Some(space.max_y),
        }
    }

    pub fn min_z(&self) -> Option<f64> {
        match self {
            STBox::Spatial3D(b) => Some(b.min_z),
            STBox::SpatioTemporal3D { space, .. } => Some(space.min_z),
            _ => None,
        }
    }

    pub fn max_z(&self) -> Option<f64> {
        match self {
            STBox::Spatial3D(b) => Some(b.max_z),
            STBox::SpatioTemporal3D { space, .. } => Some(space.max_z),
            _ => None,
        }
    }

    /// Grow this box to cover `other`.
    ///
    /// Both boxes must have the same shape and spatial reference; mixing
    /// shapes is refused rather than silently widened.
    pub fn extend_to_include(&mut self, other: &STBox) -> Result<(), String> {
        if self.kind() != other.kind() {
            return Err(format!(
                "cannot extend a {:?} box with a {:?} box",
                self.kind(),
                other.kind()
            ));
        }
        if self.srid() != other.srid() {
            return Err(format!(
                "spatial reference mismatch: {:?} vs {:?}",
                self.srid(),
                other.srid()
            ));
        }
        match (self, other) {
            (STBox::Time(a), STBox::Time(b)) => a.extend_to_include(b),
            (STBox::Spatial2D(a), STBox::Spatial2D(b)) => a.extend_to_include(b),
            (STBox::Spatial3D(a), STBox::Spatial3D(b)) => a.extend_to_include(b),
            (
                STBox::SpatioTemporal2D { space, time },
                STBox::SpatioTemporal2D {
                    space: other_space,
                    time: other_time,
                },
            ) => {
                space.extend_to_include(other_space);
                time.extend_to_include(other_time);
            }
            (
                STBox::SpatioTemporal3D { space, time },
                STBox::SpatioTemporal3D {
                    space: other_space,
                    time: other_time,
                },
            ) => {
                space.extend_to_include(other_space);
                time.extend_to_include(other_time);
            }
            _ => unreachable!("kinds checked above"),
        }
        Ok(())
    }

    /// The union of two boxes of the same shape.
    pub fn union(a: &STBox, b: &STBox) -> Result<STBox, String> {
        let mut merged = a.clone();
        merged.extend_to_include(b)?;
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn ts(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn test_timespan_normalizes_order() {
        let span = TimeSpan::new(ts(200), ts(100));
        assert_eq!(span.start, ts(100));
        assert_eq!(span.end, ts(200));
        assert_eq!(span.duration(), Duration::from_secs(100));
    }

    #[test]
    fn test_timespan_half_open_membership() {
        let span = TimeSpan::new(ts(100), ts(200));
        assert!(span.contains(ts(100), false));
        assert!(span.contains(ts(199), false));
        assert!(!span.contains(ts(200), false));
        assert!(span.contains(ts(200), true));
        assert!(!span.contains(ts(99), false));
    }

    #[test]
    fn test_timespan_touches() {
        let a = TimeSpan::new(ts(0), ts(100));
        let b = TimeSpan::new(ts(100), ts(200));
        let c = TimeSpan::new(ts(201), ts(300));
        assert!(a.touches(&b));
        assert!(b.touches(&a));
        assert!(!a.touches(&c));
    }

    #[test]
    fn test_spatial2d_extend() {
        let mut a = SpatialBox2D::new(0.0, 0.0, 10.0, 10.0);
        let b = SpatialBox2D::new(5.0, -5.0, 15.0, 5.0);
        a.extend_to_include(&b);
        assert_eq!(a.min_x(), 0.0);
        assert_eq!(a.min_y(), -5.0);
        assert_eq!(a.max_x(), 15.0);
        assert_eq!(a.max_y(), 10.0);
    }

    #[test]
    fn test_spatial3d_intersects() {
        let a = SpatialBox3D::new(0.0, 0.0, 0.0, 10.0, 10.0, 10.0);
        let b = SpatialBox3D::new(5.0, 5.0, 5.0, 15.0, 15.0, 15.0);
        let c = SpatialBox3D::new(20.0, 20.0, 20.0, 30.0, 30.0, 30.0);
        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_box_kind_flags() {
        assert!(!BoxKind::Time.has_x());
        assert!(BoxKind::Time.has_t());
        assert!(BoxKind::Spatial3D.has_z());
        assert!(!BoxKind::Spatial3D.has_t());
        assert!(BoxKind::SpatioTemporal3D.has_z());
        assert!(BoxKind::SpatioTemporal3D.has_t());
    }

    #[test]
    fn test_encoded_sizes_grow_with_shape() {
        assert!(BoxKind::Time.encoded_size() < BoxKind::Spatial2D.encoded_size());
        assert!(BoxKind::Spatial2D.encoded_size() < BoxKind::SpatioTemporal3D.encoded_size());
    }

    #[test]
    fn test_stbox_union_same_kind() {
        let a = STBox::SpatioTemporal2D {
            space: SpatialBox2D::new(0.0, 0.0, 1.0, 1.0),
            time: TimeSpan::new(ts(0), ts(10)),
        };
        let b = STBox::SpatioTemporal2D {
            space: SpatialBox2D::new(2.0, 2.0, 3.0, 3.0),
            time: TimeSpan::new(ts(5), ts(20)),
        };
        let merged = STBox::union(&a, &b).unwrap();
        assert_eq!(merged.min_x(), Some(0.0));
        assert_eq!(merged.max_x(), Some(3.0));
        assert_eq!(merged.period().unwrap().end, ts(20));
    }

    #[test]
    fn test_stbox_union_kind_mismatch() {
        let a = STBox::Time(TimeSpan::new(ts(0), ts(10)));
        let b = STBox::Spatial2D(SpatialBox2D::new(0.0, 0.0, 1.0, 1.0));
        assert!(STBox::union(&a, &b).is_err());
    }

    #[test]
    fn test_stbox_union_srid_mismatch() {
        let a = STBox::Spatial2D(SpatialBox2D::new(0.0, 0.0, 1.0, 1.0).with_srid(4326));
        let b = STBox::Spatial2D(SpatialBox2D::new(0.0, 0.0, 1.0, 1.0).with_srid(3857));
        assert!(STBox::union(&a, &b).is_err());
    }

    #[test]
    fn test_stbox_accessors() {
        let b = STBox::Spatial3D(SpatialBox3D::new(0.0, 1.0, 2.0, 3.0, 4.0, 5.0));
        assert_eq!(b.min_x(), Some(0.0));
        assert_eq!(b.min_y(), Some(1.0));
        assert_eq!(b.min_z(), Some(2.0));
        assert_eq!(b.max_x(), Some(3.0));
        assert_eq!(b.max_y(), Some(4.0));
        assert_eq!(b.max_z(), Some(5.0));
        assert!(b.period().is_none());
        assert!(b.srid().is_none());
    }
}
