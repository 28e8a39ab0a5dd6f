use crate::bbox::{STBox, SpatialBox2D, SpatialBox3D, TimeSpan};
use crate::point::{TemporalPoint, TemporalPoint3D};

pub type Trajectory = Vec<TemporalPoint>;
pub type Trajectory3D = Vec<TemporalPoint3D>;

/// Minimal bounding extent of a 2D trajectory, or `None` if it is empty.
pub fn extent(points: &[TemporalPoint]) -> Option<STBox> {
    let first = points.first()?;
    let mut space = SpatialBox2D::new(first.x(), first.y(), first.x(), first.y());
    let mut time = TimeSpan::instant(first.timestamp);
    for p in &points[1..] {
        space.extend_to_include(&SpatialBox2D::new(p.x(), p.y(), p.x(), p.y()));
        time.extend_to_include(&TimeSpan::instant(p.timestamp));
    }
    Some(STBox::SpatioTemporal2D { space, time })
}

/// Minimal bounding extent of a 3D trajectory, or `None` if it is empty.
pub fn extent_3d(points: &[TemporalPoint3D]) -> Option<STBox> {
    let first = points.first()?;
    let mut space = SpatialBox3D::new(
        first.x(),
        first.y(),
        first.altitude,
        first.x(),
        first.y(),
        first.altitude,
    );
    let mut time = TimeSpan::instant(first.timestamp);
    for p in &points[1..] {
        space.extend_to_include(&SpatialBox3D::new(
            p.x(),
            p.y(),
            p.altitude,
            p.x(),
            p.y(),
            p.altitude,
        ));
        time.extend_to_include(&TimeSpan::instant(p.timestamp));
    }
    Some(STBox::SpatioTemporal3D { space, time })
}
