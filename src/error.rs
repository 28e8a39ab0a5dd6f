//! Error types for the Tessel engine.

use thiserror::Error;

/// Errors surfaced by the tiling and aggregation engine.
///
/// None of these are retried internally; every failure is returned to the
/// immediate caller, who decides whether to retry with reduced scope.
#[derive(Error, Debug)]
pub enum TesselError {
    /// Invalid grid or engine configuration, rejected before any state is
    /// built.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A container grow hit the allocation ceiling and more room was still
    /// required. The container is left unchanged.
    #[error("allocation of {requested} bytes exceeds the {ceiling} byte ceiling")]
    AllocationLimit { requested: usize, ceiling: usize },

    /// Two values or partial states with disagreeing shape, spatial
    /// reference, or aggregate metadata were mixed.
    #[error("incompatible operands: {0}")]
    IncompatibleStates(String),

    /// Out-of-range container access.
    #[error("index {index} out of bounds for length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// A timestamp predates the configured origin.
    #[error("timestamp predates the configured origin")]
    InvalidTimestamp,

    /// Encoding or decoding a partial aggregate state failed.
    #[cfg(feature = "transport")]
    #[error("state serialization failed: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, TesselError>;
