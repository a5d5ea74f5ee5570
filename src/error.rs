//! Error taxonomy (spec §7): input errors, protocol errors, and the
//! non-error cancellation path. Workers never panic across the session
//! boundary; they convert failures into this type and send it as a
//! terminal [`crate::progress::ProgressMsg::Error`].

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObamifyError {
    #[error("source image is empty or could not be decoded")]
    InvalidImage,

    #[error("sidelen {0} is not a valid side length (must be a multiple of 64 in 64..=2048)")]
    InvalidSidelen(u32),

    #[error("proximity importance {0} out of range [1, 50]")]
    InvalidProximityImportance(i64),

    #[error("assignments length {got} does not match expected pixel count {expected}")]
    AssignmentLengthMismatch { got: usize, expected: usize },

    #[error("assignment index {index} out of range for {n} pixels")]
    AssignmentIndexOutOfRange { index: usize, n: usize },

    #[error(
        "greedy solver only consumed {consumed} of {expected} source pixels; refusing to pad with identity fillers"
    )]
    IncompleteAssignment { consumed: usize, expected: usize },

    #[error("target and weight images must share the cropped source's dimensions")]
    DimensionMismatch,

    #[error("preset directory is missing required file: {0}")]
    MissingPresetFile(String),

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ObamifyError>;
