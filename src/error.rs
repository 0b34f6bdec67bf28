//! Error types for terrain generation.
//!
//! Configuration problems are reported before any work starts. A missing
//! erosion kernel is a dependency failure, also surfaced before the first
//! iteration. A constant noise field is not an error at all: normalization
//! is skipped and generation carries on.

use thiserror::Error;

/// Invalid or inconsistent generation parameters.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("invalid resolution {0} (expected one of {valid:?})", valid = crate::config::VALID_RESOLUTIONS)]
    InvalidResolution(u32),

    #[error("octave count must not be negative (got {0})")]
    NegativeOctaveCount(i32),

    #[error("iteration count must not be negative (got {0})")]
    NegativeIterations(i32),

    #[error("offset range is empty: min {min} must be below max {max}")]
    DegenerateOffsetRange { min: i32, max: i32 },

    #[error("reference image is {width}x{height}, expected {resolution}x{resolution}")]
    ReferenceSizeMismatch {
        width: u32,
        height: u32,
        resolution: u32,
    },

    #[error("reference blending is enabled but no reference image was supplied")]
    MissingReferenceImage,

    #[error("height field data has {actual} samples, expected {expected}")]
    SampleCountMismatch { expected: usize, actual: usize },

    #[error("invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    #[error("failed to parse configuration: {0}")]
    Parse(String),

    #[error("failed to read configuration: {0}")]
    Io(String),
}

/// Failures of the erosion pipeline or its kernel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ErosionError {
    #[error("erosion kernel unavailable: {0}")]
    KernelUnavailable(String),

    #[error("{stage} stage buffer holds {actual} cells, expected {expected}")]
    BufferMismatch {
        stage: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("GPU erosion failed: {0}")]
    Gpu(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Top-level error returned by [`crate::generate`] and the binaries.
#[derive(Error, Debug)]
pub enum TerrainError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Erosion(#[from] ErosionError),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::Io(err.to_string())
    }
}
