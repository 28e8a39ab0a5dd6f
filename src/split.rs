//! Value splitting: decompose a trajectory into per-tile fragments.
//!
//! This is the consumer protocol of the tile iterator in one call: build
//! the grid state, walk the (touched) tiles, restrict the value to each
//! tile, and drop the fragments that come out empty. The restriction here
//! is instant-level membership; richer geometric clipping belongs to the
//! geometry layer, not this engine.

use crate::error::Result;
use crate::tile::{Tile, TileGridBuilder};
use tessel_types::{TemporalPoint, TemporalPoint3D, Trajectory, Trajectory3D};

/// The observations of a 2D trajectory that fall inside one tile.
pub fn restrict_to_tile(points: &[TemporalPoint], tile: &Tile) -> Trajectory {
    points
        .iter()
        .filter(|p| tile.contains_point(p))
        .cloned()
        .collect()
}

/// The observations of a 3D trajectory that fall inside one tile.
pub fn restrict_to_tile_3d(points: &[TemporalPoint3D], tile: &Tile) -> Trajectory3D {
    points
        .iter()
        .filter(|p| tile.contains_point_3d(p))
        .cloned()
        .collect()
}

/// Split a 2D trajectory along the grid described by `builder`.
///
/// Returns one `(tile, fragment)` pair per tile the trajectory actually
/// occupies, in grid order.
pub fn split_trajectory(
    points: &[TemporalPoint],
    builder: &TileGridBuilder,
) -> Result<Vec<(Tile, Trajectory)>> {
    let state = builder.build(points)?;
    let mut fragments = Vec::new();
    for tile in state {
        let fragment = restrict_to_tile(points, &tile);
        if !fragment.is_empty() {
            fragments.push((tile, fragment));
        }
    }
    log::debug!(
        "split {} observations into {} tile fragments",
        points.len(),
        fragments.len()
    );
    Ok(fragments)
}

/// Split a 3D trajectory along the grid described by `builder`.
pub fn split_trajectory_3d(
    points: &[TemporalPoint3D],
    builder: &TileGridBuilder,
) -> Result<Vec<(Tile, Trajectory3D)>> {
    let state = builder.build_3d(points)?;
    let mut fragments = Vec::new();
    for tile in state {
        let fragment = restrict_to_tile_3d(points, &tile);
        if !fragment.is_empty() {
            fragments.push((tile, fragment));
        }
    }
    log::debug!(
        "split {} observations into {} tile fragments",
        points.len(),
        fragments.len()
    );
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Point;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    fn ts(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn point(x: f64, y: f64, secs: u64) -> TemporalPoint {
        TemporalPoint::new(Point::new(x, y), ts(secs))
    }

    #[test]
    fn test_every_observation_lands_in_exactly_one_fragment() {
        let traj = vec![
            point(0.5, 0.5, 10),
            point(1.5, 0.5, 20),
            point(1.6, 1.6, 30),
            point(3.5, 3.5, 40),
        ];
        let builder = TileGridBuilder::new().x_size(1.0).y_size(1.0);
        let fragments = split_trajectory(&traj, &builder).unwrap();
        let total: usize = fragments.iter().map(|(_, frag)| frag.len()).sum();
        assert_eq!(total, traj.len());
        for (tile, frag) in &fragments {
            for p in frag {
                assert!(tile.contains_point(p));
            }
        }
    }

    #[test]
    fn test_empty_fragments_are_discarded() {
        // Two far-apart instants: the tiles between them stay empty.
        let traj = vec![point(0.5, 0.5, 10), point(7.5, 0.5, 20)];
        let builder = TileGridBuilder::new().x_size(1.0).y_size(1.0);
        let fragments = split_trajectory(&traj, &builder).unwrap();
        assert_eq!(fragments.len(), 2);
    }

    #[test]
    fn test_split_3d_respects_altitude_cells() {
        let traj = vec![
            TemporalPoint3D::new(Point::new(0.5, 0.5), 10.0, ts(0)),
            TemporalPoint3D::new(Point::new(0.5, 0.5), 90.0, ts(60)),
        ];
        let builder = TileGridBuilder::new().x_size(1.0).y_size(1.0).z_size(50.0);
        let fragments = split_trajectory_3d(&traj, &builder).unwrap();
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].1[0].altitude, 10.0);
        assert_eq!(fragments[1].1[0].altitude, 90.0);
    }
}
