//! Error types for configuration and per-call shape validation

use std::error::Error;
use std::fmt;

/// Data did not match the configured trajectory layout or set sizes.
///
/// None of these are recoverable at runtime; the data pipeline or the
/// configuration has to be fixed upstream.
#[derive(Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// A trajectory vector's length differs from `pos + yaw + 2`.
    TrajectoryLength { expected: usize, actual: usize },
    /// A trajectory set does not contain exactly the configured number of slots.
    SetSize { expected: usize, actual: usize },
    /// An observation vector's length differs from the dataset's.
    ObservationLength { expected: usize, actual: usize },
    /// Expert and predicted batches have different item counts.
    BatchSize { expert: usize, predicted: usize },
    /// A batch with zero items was passed to the loss engine.
    EmptyBatch,
    /// An expert existence indicator does not round to +1 or -1.
    ExistenceIndicator { value: f32 },
}

impl fmt::Display for ShapeError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ShapeError::TrajectoryLength { expected, actual } => {
                write!(
                    formatter,
                    "trajectory vector has {} elements, layout requires {}",
                    actual, expected
                )
            }
            ShapeError::SetSize { expected, actual } => {
                write!(
                    formatter,
                    "trajectory set has {} slots, configuration requires {}",
                    actual, expected
                )
            }
            ShapeError::ObservationLength { expected, actual } => {
                write!(
                    formatter,
                    "observation has {} elements, dataset requires {}",
                    actual, expected
                )
            }
            ShapeError::BatchSize { expert, predicted } => {
                write!(
                    formatter,
                    "expert batch has {} items but predicted batch has {}",
                    expert, predicted
                )
            }
            ShapeError::EmptyBatch => {
                write!(formatter, "batch contains no items")
            }
            ShapeError::ExistenceIndicator { value } => {
                write!(
                    formatter,
                    "expert existence indicator {} does not round to +1 or -1",
                    value
                )
            }
        }
    }
}

impl Error for ShapeError {}

/// Invalid configuration, rejected at construction time.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// The layout has no position control points.
    ZeroPositionPoints,
    /// The configured trajectory-set size is zero.
    ZeroSetSize,
    /// The existence-loss weight is negative, NaN or infinite.
    InvalidWeight { value: f32 },
    /// Neither or both of the epoch/batch schedule options were set.
    AmbiguousSchedule,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::ZeroPositionPoints => {
                write!(formatter, "layout requires at least one position control point")
            }
            ConfigError::ZeroSetSize => {
                write!(formatter, "trajectory-set size must be at least 1")
            }
            ConfigError::InvalidWeight { value } => {
                write!(
                    formatter,
                    "existence-loss weight must be finite and non-negative, got {}",
                    value
                )
            }
            ConfigError::AmbiguousSchedule => {
                write!(formatter, "exactly one of n_epochs and n_batches must be set")
            }
        }
    }
}

impl Error for ConfigError {}
