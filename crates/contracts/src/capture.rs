//! CaptureSource trait - upstream camera/pose producer
//!
//! The capture loop polls a source once per tick. Each sample carries the
//! device pose and the camera frame for the same timestamp.

use std::time::Duration;

use crate::{CameraFrame, DevicePose};

/// Pose and frame captured for one timestamp
#[derive(Debug, Clone)]
pub struct CaptureSample {
    pub pose: DevicePose,
    pub frame: CameraFrame,
}

/// Capture source trait
///
/// Abstracts the host passthrough camera. The real implementation lives in
/// the host application; tests and the CLI use a synthetic source.
pub trait CaptureSource: Send {
    /// Source identifier (for logging)
    fn source_id(&self) -> &str;

    /// Nominal time between samples
    fn frame_interval(&self) -> Duration;

    /// Next sample, or `None` once the source is exhausted
    fn poll(&mut self) -> Option<CaptureSample>;
}
