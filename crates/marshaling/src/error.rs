//! Marshaling error types

use thiserror::Error;

/// Marshaling error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MarshalError {
    /// Pixel buffer length does not equal `width * height * 3`
    #[error("frame size mismatch for {width}x{height}: expected {expected:?} bytes, got {actual}")]
    SizeMismatch {
        width: u32,
        height: u32,
        /// `None` when `width * height * 3` overflows
        expected: Option<usize>,
        actual: usize,
    },

    /// Frame with a zero dimension
    #[error("empty frame: {width}x{height}")]
    EmptyFrame { width: u32, height: u32 },

    /// Pose array of the wrong length
    #[error("malformed pose: {field} has {actual} components, expected {expected}")]
    MalformedPose {
        field: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Intrinsics array of the wrong length
    #[error("intrinsics must have {expected} floats, got {actual}")]
    IntrinsicsLength { expected: usize, actual: usize },

    /// Intrinsics values violate their invariants
    #[error("invalid intrinsics: {message}")]
    InvalidIntrinsics { message: String },
}

impl MarshalError {
    /// Short label for logs and metric tags
    pub fn reason(&self) -> &'static str {
        match self {
            MarshalError::SizeMismatch { .. } => "size_mismatch",
            MarshalError::EmptyFrame { .. } => "empty_frame",
            MarshalError::MalformedPose { .. } => "malformed_pose",
            MarshalError::IntrinsicsLength { .. } => "intrinsics_length",
            MarshalError::InvalidIntrinsics { .. } => "invalid_intrinsics",
        }
    }
}

/// Marshaling Result alias
pub type Result<T> = std::result::Result<T, MarshalError>;
