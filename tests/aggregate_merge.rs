use geo::Point;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessel::{
    AggregateState, BucketSpec, CentroidState, CountState, ExtentState, TesselError, UnionState,
};
use tessel_types::{STBox, TemporalPoint, TimeSpan, extent};

fn ts(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn point(x: f64, y: f64, secs: u64) -> TemporalPoint {
    TemporalPoint::new(Point::new(x, y), ts(secs))
}

fn sample_partitions() -> [Vec<TemporalPoint>; 3] {
    [
        vec![point(0.0, 0.0, 10), point(1.0, 2.0, 70)],
        vec![point(5.0, -1.0, 20), point(3.0, 3.0, 130), point(4.0, 0.0, 135)],
        vec![point(-2.0, 7.0, 200)],
    ]
}

fn count_state(points: &[TemporalPoint]) -> Option<CountState> {
    let bucket = BucketSpec::new(UNIX_EPOCH, Duration::from_secs(60)).unwrap();
    Some(CountState::fold(None, points, bucket).unwrap())
}

fn extent_state(points: &[TemporalPoint]) -> Option<ExtentState> {
    let bx = extent(points).unwrap();
    Some(ExtentState::fold(None, &bx).unwrap())
}

/// Test 1: combine is commutative and associative for the count aggregate:
/// every grouping and order of three partitions finalizes identically
#[test]
fn test_count_combine_order_invariant() {
    let [a, b, c] = sample_partitions();
    let build = |points: &Vec<TemporalPoint>| count_state(points);

    let ab_c = CountState::combine(
        CountState::combine(build(&a), build(&b)).unwrap(),
        build(&c),
    )
    .unwrap();
    let a_bc = CountState::combine(
        build(&a),
        CountState::combine(build(&b), build(&c)).unwrap(),
    )
    .unwrap();
    let c_ba = CountState::combine(
        build(&c),
        CountState::combine(build(&b), build(&a)).unwrap(),
    )
    .unwrap();
    let b_ca = CountState::combine(
        CountState::combine(build(&c), build(&a)).unwrap(),
        build(&b),
    )
    .unwrap();

    let expected = ab_c.unwrap().finalize();
    assert_eq!(a_bc.unwrap().finalize(), expected);
    assert_eq!(c_ba.unwrap().finalize(), expected);
    assert_eq!(b_ca.unwrap().finalize(), expected);
    assert_eq!(
        expected,
        vec![(ts(0), 2), (ts(60), 1), (ts(120), 2), (ts(180), 1)]
    );
}

/// Test 2: combine is commutative and associative for the extent aggregate
#[test]
fn test_extent_combine_order_invariant() {
    let [a, b, c] = sample_partitions();
    let build = |points: &Vec<TemporalPoint>| extent_state(points);

    let groupings = [
        ExtentState::combine(
            ExtentState::combine(build(&a), build(&b)).unwrap(),
            build(&c),
        ),
        ExtentState::combine(
            build(&a),
            ExtentState::combine(build(&b), build(&c)).unwrap(),
        ),
        ExtentState::combine(
            ExtentState::combine(build(&c), build(&b)).unwrap(),
            build(&a),
        ),
    ];

    let outputs: Vec<STBox> = groupings
        .into_iter()
        .map(|state| state.unwrap().unwrap().finalize())
        .collect();
    assert_eq!(outputs[0], outputs[1]);
    assert_eq!(outputs[1], outputs[2]);
    assert_eq!(outputs[0].min_x(), Some(-2.0));
    assert_eq!(outputs[0].max_x(), Some(5.0));
    assert_eq!(outputs[0].period().unwrap().end, ts(200));
}

/// Test 3: partition invariance: folding the full stream equals combining
/// partial states folded over any partition of it
#[test]
fn test_partition_invariance() {
    let [a, b, c] = sample_partitions();
    let full: Vec<TemporalPoint> = [a.clone(), b.clone(), c.clone()].concat();

    // Count.
    let whole = count_state(&full).unwrap();
    let merged = CountState::combine(
        count_state(&a),
        CountState::combine(count_state(&b), count_state(&c)).unwrap(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(whole.finalize(), merged.finalize());

    // Extent.
    let whole = extent_state(&full).unwrap();
    let merged = ExtentState::combine(
        extent_state(&a),
        ExtentState::combine(extent_state(&b), extent_state(&c)).unwrap(),
    )
    .unwrap()
    .unwrap();
    assert_eq!(whole.finalize(), merged.finalize());
}

/// Test 4: empty operands act as the identity on either side
#[test]
fn test_empty_state_is_identity() {
    let [a, _, _] = sample_partitions();
    let some = count_state(&a);
    let left = CountState::combine(None, some.clone()).unwrap();
    let right = CountState::combine(some.clone(), None).unwrap();
    assert_eq!(
        left.unwrap().finalize(),
        right.unwrap().finalize()
    );
    assert!(CountState::combine(None, None).unwrap().is_none());
}

/// Test 5: combine refuses operands whose metadata disagree
#[test]
fn test_incompatible_states_refused() {
    let [a, b, _] = sample_partitions();

    let minutes = BucketSpec::new(UNIX_EPOCH, Duration::from_secs(60)).unwrap();
    let halves = BucketSpec::new(UNIX_EPOCH, Duration::from_secs(30)).unwrap();
    let fine = CountState::fold(None, &a, minutes).unwrap();
    let coarse = CountState::fold(None, &b, halves).unwrap();
    let err = CountState::combine(Some(fine), Some(coarse)).unwrap_err();
    assert!(matches!(err, TesselError::IncompatibleStates(_)));

    // Extent states of different dimensionality are refused too.
    let flat = ExtentState::fold(None, &extent(&a).unwrap()).unwrap();
    let time_only =
        ExtentState::fold(None, &STBox::Time(TimeSpan::new(ts(0), ts(10)))).unwrap();
    let err = ExtentState::combine(Some(flat), Some(time_only)).unwrap_err();
    assert!(matches!(err, TesselError::IncompatibleStates(_)));
}

/// Test 6: interval union per group key, canonicalized at finalize
#[test]
fn test_union_by_group_key() {
    let span = |a: u64, b: u64| TimeSpan::new(ts(a), ts(b));

    let mut worker_a = None;
    for (key, s) in [("t1", span(0, 100)), ("t2", span(40, 60)), ("t1", span(90, 150))] {
        worker_a = Some(UnionState::fold(worker_a, key, s).unwrap());
    }
    let mut worker_b = None;
    for (key, s) in [("t1", span(150, 200)), ("t2", span(300, 310))] {
        worker_b = Some(UnionState::fold(worker_b, key, s).unwrap());
    }

    let merged = UnionState::combine(worker_a, worker_b).unwrap().unwrap();
    let out = merged.finalize();
    assert_eq!(out["t1"], vec![span(0, 200)]);
    assert_eq!(out["t2"], vec![span(40, 60), span(300, 310)]);
}

/// Test 7: the centroid track equals the weighted mean of all workers'
/// observations regardless of partitioning
#[test]
fn test_centroid_partition_invariance() {
    let all = vec![
        point(0.0, 0.0, 10),
        point(2.0, 4.0, 10),
        point(10.0, 0.0, 10),
        point(1.0, 1.0, 50),
    ];
    let whole = CentroidState::fold(None, &all).unwrap();

    let a = CentroidState::fold(None, &all[..1]).unwrap();
    let b = CentroidState::fold(None, &all[1..3]).unwrap();
    let c = CentroidState::fold(None, &all[3..]).unwrap();
    let merged = CentroidState::combine(
        CentroidState::combine(Some(b), Some(c)).unwrap(),
        Some(a),
    )
    .unwrap()
    .unwrap();

    assert_eq!(whole.finalize(), merged.finalize());
}

/// Test 8: partial states round-trip through the wire encoding used to
/// ship them between workers
#[cfg(feature = "transport")]
#[test]
fn test_states_round_trip_through_transport() {
    use tessel::agg::{decode_state, encode_state};

    let [a, b, _] = sample_partitions();
    let state = count_state(&a).unwrap();
    let bytes = encode_state(&state).unwrap();
    let decoded: CountState = decode_state(&bytes).unwrap();
    assert_eq!(state, decoded);

    // A decoded state keeps combining like a local one.
    let merged = CountState::combine(Some(decoded), count_state(&b))
        .unwrap()
        .unwrap();
    assert_eq!(merged.finalize().iter().map(|(_, n)| n).sum::<u64>(), 5);
}
