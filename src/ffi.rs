//! C-compatible FFI for the Tessel engine.
//!
//! These functions provide a minimal handle-based interface that can be
//! consumed from C or other languages that interoperate with a `cdylib`.
//!
//! The API follows a status-code pattern: `0` indicates success, negative
//! numbers indicate errors, and positive numbers are reserved for
//! non-error states such as "iterator exhausted".

use crate::agg::{AggregateState, BucketSpec, CountState, ExtentState};
use crate::bitmatrix::BitMatrix;
use crate::boxarray::BoxArray;
use crate::tile::{TileGridBuilder, TileGridState};
use geo::Point;
use std::os::raw::c_int;
use std::ptr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tessel_types::{BoxKind, STBox, SpatialBox2D, SpatialBox3D, TemporalPoint, TimeSpan};

/// Generic success status.
const TESSEL_OK: c_int = 0;
/// Returned when the provided arguments are null or otherwise invalid.
const TESSEL_ERR_INVALID_ARGUMENT: c_int = -1;
/// Returned when an internal engine operation fails.
const TESSEL_ERR_OPERATION_FAILED: c_int = -2;
/// Returned when an iterator is exhausted or a state is empty.
pub const TESSEL_STATUS_DONE: c_int = 1;

/// Box shape codes used across the boundary.
const KIND_TIME: c_int = 0;
const KIND_SPATIAL_2D: c_int = 1;
const KIND_SPATIAL_3D: c_int = 2;
const KIND_SPATIOTEMPORAL_2D: c_int = 3;
const KIND_SPATIOTEMPORAL_3D: c_int = 4;

/// Opaque box array handle exposed to C callers.
#[repr(C)]
pub struct TesselBoxArrayHandle {
    array: BoxArray,
}

/// Opaque tile iterator handle exposed to C callers.
#[repr(C)]
pub struct TesselTileStateHandle {
    state: TileGridState,
}

/// Opaque bit matrix handle exposed to C callers.
#[repr(C)]
pub struct TesselBitMatrixHandle {
    matrix: BitMatrix,
}

/// Opaque extent-aggregate handle exposed to C callers.
#[repr(C)]
pub struct TesselExtentHandle {
    state: Option<ExtentState>,
}

/// Opaque count-aggregate handle exposed to C callers.
#[repr(C)]
pub struct TesselCountHandle {
    bucket: BucketSpec,
    state: Option<CountState>,
}

/// Flat bounding-box record crossing the boundary.
///
/// `srid == 0` means "no spatial reference". Timestamps are Unix
/// nanoseconds.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TesselBoxRecord {
    pub kind: c_int,
    pub srid: i32,
    pub min_x: f64,
    pub min_y: f64,
    pub min_z: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub max_z: f64,
    pub t_start_nanos: i64,
    pub t_end_nanos: i64,
}

/// One timestamped 2D observation crossing the boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TesselObservation {
    pub x: f64,
    pub y: f64,
    pub t_nanos: i64,
}

/// Grid parameters crossing the boundary. A size (or step) of zero leaves
/// that dimension out of the grid.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TesselGridParams {
    pub x_size: f64,
    pub y_size: f64,
    pub time_step_nanos: i64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub time_origin_nanos: i64,
    pub use_bit_matrix: u8,
    pub include_upper_border: u8,
}

fn nanos_to_time(nanos: i64) -> SystemTime {
    if nanos >= 0 {
        UNIX_EPOCH + Duration::from_nanos(nanos as u64)
    } else {
        UNIX_EPOCH - Duration::from_nanos(nanos.unsigned_abs())
    }
}

fn time_to_nanos(at: SystemTime) -> i64 {
    match at.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(e) => -(e.duration().as_nanos() as i64),
    }
}

fn kind_from_code(code: c_int) -> Option<BoxKind> {
    match code {
        KIND_TIME => Some(BoxKind::Time),
        KIND_SPATIAL_2D => Some(BoxKind::Spatial2D),
        KIND_SPATIAL_3D => Some(BoxKind::Spatial3D),
        KIND_SPATIOTEMPORAL_2D => Some(BoxKind::SpatioTemporal2D),
        KIND_SPATIOTEMPORAL_3D => Some(BoxKind::SpatioTemporal3D),
        _ => None,
    }
}

fn kind_to_code(kind: BoxKind) -> c_int {
    match kind {
        BoxKind::Time => KIND_TIME,
        BoxKind::Spatial2D => KIND_SPATIAL_2D,
        BoxKind::Spatial3D => KIND_SPATIAL_3D,
        BoxKind::SpatioTemporal2D => KIND_SPATIOTEMPORAL_2D,
        BoxKind::SpatioTemporal3D => KIND_SPATIOTEMPORAL_3D,
    }
}

fn record_to_box(record: &TesselBoxRecord) -> Option<STBox> {
    let kind = kind_from_code(record.kind)?;
    let srid = (record.srid != 0).then_some(record.srid);
    let space_2d = || {
        let mut space = SpatialBox2D::new(record.min_x, record.min_y, record.max_x, record.max_y);
        space.srid = srid;
        space
    };
    let space_3d = || {
        let mut space = SpatialBox3D::new(
            record.min_x,
            record.min_y,
            record.min_z,
            record.max_x,
            record.max_y,
            record.max_z,
        );
        space.srid = srid;
        space
    };
    let time = || {
        TimeSpan::new(
            nanos_to_time(record.t_start_nanos),
            nanos_to_time(record.t_end_nanos),
        )
    };
    Some(match kind {
        BoxKind::Time => STBox::Time(time()),
        BoxKind::Spatial2D => STBox::Spatial2D(space_2d()),
        BoxKind::Spatial3D => STBox::Spatial3D(space_3d()),
        BoxKind::SpatioTemporal2D => STBox::SpatioTemporal2D {
            space: space_2d(),
            time: time(),
        },
        BoxKind::SpatioTemporal3D => STBox::SpatioTemporal3D {
            space: space_3d(),
            time: time(),
        },
    })
}

fn box_to_record(bx: &STBox) -> TesselBoxRecord {
    let mut record = TesselBoxRecord {
        kind: kind_to_code(bx.kind()),
        srid: bx.srid().unwrap_or(0),
        ..TesselBoxRecord::default()
    };
    if let (Some(min_x), Some(max_x)) = (bx.min_x(), bx.max_x()) {
        record.min_x = min_x;
        record.max_x = max_x;
    }
    if let (Some(min_y), Some(max_y)) = (bx.min_y(), bx.max_y()) {
        record.min_y = min_y;
        record.max_y = max_y;
    }
    if let (Some(min_z), Some(max_z)) = (bx.min_z(), bx.max_z()) {
        record.min_z = min_z;
        record.max_z = max_z;
    }
    if let Some(span) = bx.period() {
        record.t_start_nanos = time_to_nanos(span.start);
        record.t_end_nanos = time_to_nanos(span.end);
    }
    record
}

unsafe fn observations_from_raw(
    points: *const TesselObservation,
    len: usize,
) -> Option<Vec<TemporalPoint>> {
    if points.is_null() && len != 0 {
        return None;
    }
    let slice: &[TesselObservation] = if len == 0 {
        &[]
    } else {
        unsafe { std::slice::from_raw_parts(points, len) }
    };
    Some(
        slice
            .iter()
            .map(|obs| TemporalPoint::new(Point::new(obs.x, obs.y), nanos_to_time(obs.t_nanos)))
            .collect(),
    )
}

/// # Safety
/// None beyond the usual FFI contract; returns null on an unknown kind
/// code.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_boxarray_make(
    kind: c_int,
    initial_capacity: usize,
) -> *mut TesselBoxArrayHandle {
    match kind_from_code(kind) {
        Some(kind) => Box::into_raw(Box::new(TesselBoxArrayHandle {
            array: BoxArray::make(kind, initial_capacity),
        })),
        None => ptr::null_mut(),
    }
}

/// # Safety
/// `handle` must come from `tessel_boxarray_make`; `record` must point to a
/// valid record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_boxarray_add(
    handle: *mut TesselBoxArrayHandle,
    record: *const TesselBoxRecord,
) -> c_int {
    if handle.is_null() || record.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let array = unsafe { &mut (*handle).array };
    let bx = match record_to_box(unsafe { &*record }) {
        Some(bx) => bx,
        None => return TESSEL_ERR_INVALID_ARGUMENT,
    };
    match array.add(bx) {
        Ok(()) => TESSEL_OK,
        Err(_) => TESSEL_ERR_OPERATION_FAILED,
    }
}

/// Number of boxes stored, or -1 on a null handle.
///
/// # Safety
/// `handle` must be null or come from `tessel_boxarray_make`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_boxarray_n(handle: *const TesselBoxArrayHandle) -> isize {
    if handle.is_null() {
        return -1;
    }
    unsafe { (*handle).array.len() as isize }
}

/// # Safety
/// `handle` must come from `tessel_boxarray_make`; `out` must point to
/// writable memory for one record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_boxarray_get(
    handle: *const TesselBoxArrayHandle,
    index: usize,
    out: *mut TesselBoxRecord,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let array = unsafe { &(*handle).array };
    match array.get(index) {
        Ok(bx) => {
            unsafe {
                *out = box_to_record(bx);
            }
            TESSEL_OK
        }
        Err(_) => TESSEL_ERR_INVALID_ARGUMENT,
    }
}

/// # Safety
/// `handle` must be null or a pointer not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_boxarray_free(handle: *mut TesselBoxArrayHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// # Safety
/// `points` must point to `len` observations; `params` must be valid.
/// Returns null when the grid configuration is rejected.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_tile_state_make(
    points: *const TesselObservation,
    len: usize,
    params: *const TesselGridParams,
) -> *mut TesselTileStateHandle {
    if params.is_null() {
        return ptr::null_mut();
    }
    let params = unsafe { &*params };
    let traj = match unsafe { observations_from_raw(points, len) } {
        Some(traj) => traj,
        None => return ptr::null_mut(),
    };

    let mut builder = TileGridBuilder::new()
        .x_size(params.x_size)
        .y_size(params.y_size)
        .space_origin(Point::new(params.origin_x, params.origin_y))
        .time_origin(nanos_to_time(params.time_origin_nanos))
        .use_bit_matrix(params.use_bit_matrix != 0)
        .include_upper_border(params.include_upper_border != 0);
    if params.time_step_nanos > 0 {
        builder = builder.time_step(Duration::from_nanos(params.time_step_nanos as u64));
    }

    match builder.build(&traj) {
        Ok(state) => Box::into_raw(Box::new(TesselTileStateHandle { state })),
        Err(_) => ptr::null_mut(),
    }
}

/// Write the current tile into `out`; `TESSEL_STATUS_DONE` once exhausted.
///
/// # Safety
/// `handle` must come from `tessel_tile_state_make`; `out` must point to
/// writable memory for one record.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_tile_state_get(
    handle: *const TesselTileStateHandle,
    out: *mut TesselBoxRecord,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let state = unsafe { &(*handle).state };
    match state.materialize() {
        Some(tile) => {
            unsafe {
                *out = box_to_record(tile.bbox());
            }
            TESSEL_OK
        }
        None => TESSEL_STATUS_DONE,
    }
}

/// Advance to the next (touched) tile.
///
/// # Safety
/// `handle` must come from `tessel_tile_state_make`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_tile_state_next(handle: *mut TesselTileStateHandle) -> c_int {
    if handle.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let state = unsafe { &mut (*handle).state };
    state.advance();
    if state.is_done() {
        TESSEL_STATUS_DONE
    } else {
        TESSEL_OK
    }
}

/// # Safety
/// `handle` must be null or a pointer not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_tile_state_free(handle: *mut TesselTileStateHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// # Safety
/// `counts` must point to `ndims` per-dimension cell counts. Returns null
/// when the matrix cannot be allocated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_bitmatrix_make(
    counts: *const usize,
    ndims: usize,
) -> *mut TesselBitMatrixHandle {
    if counts.is_null() || ndims == 0 {
        return ptr::null_mut();
    }
    let counts = unsafe { std::slice::from_raw_parts(counts, ndims) };
    match BitMatrix::make(counts) {
        Ok(matrix) => Box::into_raw(Box::new(TesselBitMatrixHandle { matrix })),
        Err(_) => ptr::null_mut(),
    }
}

/// # Safety
/// `handle` must come from `tessel_bitmatrix_make`; `coords` must point to
/// as many coordinates as the matrix has dimensions.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_bitmatrix_set(
    handle: *mut TesselBitMatrixHandle,
    coords: *const usize,
    ndims: usize,
) -> c_int {
    if handle.is_null() || coords.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let matrix = unsafe { &mut (*handle).matrix };
    if ndims != matrix.counts().len() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let coords = unsafe { std::slice::from_raw_parts(coords, ndims) };
    if coords.iter().zip(matrix.counts()).any(|(&c, &n)| c >= n) {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    matrix.set_bit(coords);
    TESSEL_OK
}

/// Returns 1 when the bit is set, 0 when clear, negative on error.
///
/// # Safety
/// Same contract as `tessel_bitmatrix_set`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_bitmatrix_test(
    handle: *const TesselBitMatrixHandle,
    coords: *const usize,
    ndims: usize,
) -> c_int {
    if handle.is_null() || coords.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let matrix = unsafe { &(*handle).matrix };
    if ndims != matrix.counts().len() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let coords = unsafe { std::slice::from_raw_parts(coords, ndims) };
    if coords.iter().zip(matrix.counts()).any(|(&c, &n)| c >= n) {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    matrix.test_bit(coords) as c_int
}

/// # Safety
/// `handle` must be null or a pointer not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_bitmatrix_free(handle: *mut TesselBitMatrixHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// Create an empty extent-aggregate state.
#[unsafe(no_mangle)]
pub extern "C" fn tessel_extent_make() -> *mut TesselExtentHandle {
    Box::into_raw(Box::new(TesselExtentHandle { state: None }))
}

/// # Safety
/// `handle` must come from `tessel_extent_make`; `record` must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_extent_fold(
    handle: *mut TesselExtentHandle,
    record: *const TesselBoxRecord,
) -> c_int {
    if handle.is_null() || record.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let bx = match record_to_box(unsafe { &*record }) {
        Some(bx) => bx,
        None => return TESSEL_ERR_INVALID_ARGUMENT,
    };
    let slot = unsafe { &mut (*handle).state };
    let prior = slot.take();
    match ExtentState::fold(prior.clone(), &bx) {
        Ok(state) => {
            *slot = Some(state);
            TESSEL_OK
        }
        Err(_) => {
            *slot = prior;
            TESSEL_ERR_OPERATION_FAILED
        }
    }
}

/// Merge `other` into `into`; `other` is left usable.
///
/// # Safety
/// Both handles must come from `tessel_extent_make`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_extent_combine(
    into: *mut TesselExtentHandle,
    other: *const TesselExtentHandle,
) -> c_int {
    if into.is_null() || other.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let slot = unsafe { &mut (*into).state };
    let other = unsafe { (*other).state.clone() };
    let prior = slot.take();
    match ExtentState::combine(prior.clone(), other) {
        Ok(merged) => {
            *slot = merged;
            TESSEL_OK
        }
        Err(_) => {
            *slot = prior;
            TESSEL_ERR_OPERATION_FAILED
        }
    }
}

/// Write the final extent into `out`; `TESSEL_STATUS_DONE` when the state
/// never saw input.
///
/// # Safety
/// `handle` must come from `tessel_extent_make`; `out` must be writable.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_extent_finalize(
    handle: *const TesselExtentHandle,
    out: *mut TesselBoxRecord,
) -> c_int {
    if handle.is_null() || out.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    match unsafe { &(*handle).state } {
        Some(state) => {
            unsafe {
                *out = box_to_record(state.current());
            }
            TESSEL_OK
        }
        None => TESSEL_STATUS_DONE,
    }
}

/// # Safety
/// `handle` must be null or a pointer not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_extent_free(handle: *mut TesselExtentHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}

/// Create an empty count-aggregate state with the given bucketing. Returns
/// null on a non-positive width.
#[unsafe(no_mangle)]
pub extern "C" fn tessel_count_make(
    origin_nanos: i64,
    width_nanos: i64,
) -> *mut TesselCountHandle {
    if width_nanos <= 0 {
        return ptr::null_mut();
    }
    match BucketSpec::new(
        nanos_to_time(origin_nanos),
        Duration::from_nanos(width_nanos as u64),
    ) {
        Ok(bucket) => Box::into_raw(Box::new(TesselCountHandle {
            bucket,
            state: None,
        })),
        Err(_) => ptr::null_mut(),
    }
}

/// # Safety
/// `handle` must come from `tessel_count_make`; `points` must point to
/// `len` observations.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_count_fold(
    handle: *mut TesselCountHandle,
    points: *const TesselObservation,
    len: usize,
) -> c_int {
    if handle.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let traj = match unsafe { observations_from_raw(points, len) } {
        Some(traj) => traj,
        None => return TESSEL_ERR_INVALID_ARGUMENT,
    };
    let handle = unsafe { &mut *handle };
    let prior = handle.state.take();
    match CountState::fold(prior.clone(), &traj, handle.bucket) {
        Ok(state) => {
            handle.state = Some(state);
            TESSEL_OK
        }
        Err(_) => {
            handle.state = prior;
            TESSEL_ERR_OPERATION_FAILED
        }
    }
}

/// Merge `other` into `into`; `other` is left usable.
///
/// # Safety
/// Both handles must come from `tessel_count_make`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_count_combine(
    into: *mut TesselCountHandle,
    other: *const TesselCountHandle,
) -> c_int {
    if into.is_null() || other.is_null() {
        return TESSEL_ERR_INVALID_ARGUMENT;
    }
    let slot = unsafe { &mut (*into).state };
    let other = unsafe { (*other).state.clone() };
    let prior = slot.take();
    match CountState::combine(prior.clone(), other) {
        Ok(merged) => {
            *slot = merged;
            TESSEL_OK
        }
        Err(_) => {
            *slot = prior;
            TESSEL_ERR_OPERATION_FAILED
        }
    }
}

/// Write up to `cap` steps of the stepwise count into the output arrays.
/// Returns the total number of steps, or a negative error code; callers
/// retry with a bigger buffer when the return value exceeds `cap`.
///
/// # Safety
/// `handle` must come from `tessel_count_make`; `out_starts` and
/// `out_counts` must each have room for `cap` elements.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_count_finalize(
    handle: *const TesselCountHandle,
    out_starts: *mut i64,
    out_counts: *mut u64,
    cap: usize,
) -> isize {
    if handle.is_null() || (cap != 0 && (out_starts.is_null() || out_counts.is_null())) {
        return TESSEL_ERR_INVALID_ARGUMENT as isize;
    }
    let steps = match unsafe { (*handle).state.clone() } {
        Some(state) => state.finalize(),
        None => Vec::new(),
    };
    for (i, (start, count)) in steps.iter().take(cap).enumerate() {
        unsafe {
            *out_starts.add(i) = time_to_nanos(*start);
            *out_counts.add(i) = *count;
        }
    }
    steps.len() as isize
}

/// # Safety
/// `handle` must be null or a pointer not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn tessel_count_free(handle: *mut TesselCountHandle) {
    if handle.is_null() {
        return;
    }
    drop(unsafe { Box::from_raw(handle) });
}
