use geo::Point;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessel::{EngineConfig, TesselError, TileGridBuilder, split_trajectory};
use tessel_types::{TemporalPoint, TemporalPoint3D};

fn ts(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn point(x: f64, y: f64, secs: u64) -> TemporalPoint {
    TemporalPoint::new(Point::new(x, y), ts(secs))
}

/// Test 1: Large trajectory stress test
#[test]
fn test_large_trajectory_split() {
    // 10K observations walking a spiral (keeping it reasonable for CI).
    let traj: Vec<TemporalPoint> = (0..10_000)
        .map(|i| {
            let angle = i as f64 * 0.01;
            let radius = i as f64 * 0.001;
            point(radius * angle.cos(), radius * angle.sin(), i)
        })
        .collect();

    // The spiral reaches radius 10 in every direction, so the grid origin
    // sits at its south-west corner.
    let builder = TileGridBuilder::new()
        .x_size(1.0)
        .y_size(1.0)
        .space_origin(Point::new(-10.0, -10.0))
        .time_step(Duration::from_secs(600))
        .use_bit_matrix(true);
    let fragments = split_trajectory(&traj, &builder).expect("split failed");

    let total: usize = fragments.iter().map(|(_, frag)| frag.len()).sum();
    assert_eq!(total, traj.len());
}

/// Test 2: Extreme coordinate values
#[test]
fn test_extreme_coordinates() {
    let traj = vec![point(-180.0, -90.0, 0), point(180.0, 90.0, 60)];
    let builder = TileGridBuilder::new()
        .x_size(10.0)
        .y_size(10.0)
        .space_origin(Point::new(-180.0, -90.0));
    let state = builder.build(&traj).expect("build failed");
    // 36 x 18 cells over the whole globe.
    assert_eq!(state.grid().counts().as_slice(), &[36, 18]);

    let fragments = split_trajectory(&traj, &builder).expect("split failed");
    let total: usize = fragments.iter().map(|(_, frag)| frag.len()).sum();
    // The north-east corner observation sits on the open upper border.
    assert_eq!(total, 1);

    let closed = builder.clone().include_upper_border(true);
    let fragments = split_trajectory(&traj, &closed).expect("split failed");
    let total: usize = fragments.iter().map(|(_, frag)| frag.len()).sum();
    assert_eq!(total, 2);
}

/// Test 3: A single stationary observation tiles to exactly one cell
#[test]
fn test_single_observation() {
    let traj = vec![point(0.5, 0.5, 42)];
    let builder = TileGridBuilder::new()
        .x_size(1.0)
        .y_size(1.0)
        .time_step(Duration::from_secs(60))
        .use_bit_matrix(true);
    let fragments = split_trajectory(&traj, &builder).expect("split failed");
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].0.coords(), &[0, 0, 0]);
    assert_eq!(fragments[0].1.len(), 1);
}

/// Test 4: A stationary trajectory (all observations in one spot)
#[test]
fn test_stationary_trajectory() {
    let traj: Vec<TemporalPoint> = (0..20).map(|i| point(3.3, 7.7, i * 5)).collect();
    let builder = TileGridBuilder::new()
        .x_size(1.0)
        .y_size(1.0)
        .use_bit_matrix(true);
    let fragments = split_trajectory(&traj, &builder).expect("split failed");
    assert_eq!(fragments.len(), 1);
    assert_eq!(fragments[0].1.len(), 20);
}

/// Test 5: Observations before the grid's time origin fall outside every
/// tile and are dropped, not misfiled
#[test]
fn test_pre_origin_observations_dropped() {
    let before_origin =
        TemporalPoint::new(Point::new(0.5, 0.5), UNIX_EPOCH - Duration::from_secs(100));
    let traj = vec![before_origin, point(0.5, 0.5, 30)];
    let builder = TileGridBuilder::new()
        .x_size(1.0)
        .y_size(1.0)
        .time_step(Duration::from_secs(60));
    let fragments = split_trajectory(&traj, &builder).expect("split failed");
    let total: usize = fragments.iter().map(|(_, frag)| frag.len()).sum();
    assert_eq!(total, 1);
}

/// Test 6: A tiny allocation ceiling rejects an oversized bit matrix
/// instead of allocating it
#[test]
fn test_bit_matrix_hits_allocation_ceiling() {
    let traj = vec![point(0.0, 0.0, 0), point(100_000.0, 100_000.0, 60)];
    let builder = TileGridBuilder::new()
        .x_size(0.5)
        .y_size(0.5)
        .use_bit_matrix(true)
        .config(EngineConfig::default().with_alloc_ceiling(1024));
    let err = builder.build(&traj).expect_err("build must fail");
    assert!(matches!(err, TesselError::AllocationLimit { .. }));
}

/// Test 7: Zero-size spatial dimensions plus a time step tile by time alone
#[test]
fn test_time_only_fallback() {
    let traj = vec![point(5.0, 5.0, 0), point(6.0, 6.0, 120)];
    let state = TileGridBuilder::new()
        .time_step(Duration::from_secs(60))
        .build(&traj)
        .expect("build failed");
    assert!(state.grid().x_axis().is_none());
    assert_eq!(state.grid().time_axis().map(|axis| axis.count), Some(2));
}

/// Test 8: 3D observations at the same planar spot separate by altitude
#[test]
fn test_3d_altitude_separation() {
    use tessel::split_trajectory_3d;

    let traj = vec![
        TemporalPoint3D::new(Point::new(0.5, 0.5), 5.0, ts(0)),
        TemporalPoint3D::new(Point::new(0.5, 0.5), 55.0, ts(10)),
        TemporalPoint3D::new(Point::new(0.5, 0.5), 105.0, ts(20)),
    ];
    let builder = TileGridBuilder::new()
        .x_size(1.0)
        .y_size(1.0)
        .z_size(50.0)
        .use_bit_matrix(true);
    let fragments = split_trajectory_3d(&traj, &builder).expect("split failed");
    assert_eq!(fragments.len(), 3);
    for (tile, fragment) in &fragments {
        assert_eq!(fragment.len(), 1);
        assert!(tile.bbox().has_z());
    }
}
