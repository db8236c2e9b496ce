//! Device poses as produced by the capture source and as handed to the engine.

use serde::{Deserialize, Serialize};

/// Device pose for one capture timestamp
///
/// Rotation is a unit quaternion in `(x, y, z, w)` order. Timestamps are
/// monotonically non-decreasing within a session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DevicePose {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub timestamp_ns: i64,
}

impl DevicePose {
    pub fn identity(timestamp_ns: i64) -> Self {
        Self {
            position: [0.0; 3],
            rotation: [0.0, 0.0, 0.0, 1.0],
            timestamp_ns,
        }
    }
}

/// Pose marshaled for the engine's ingestion entry point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineLocator {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
    pub timestamp_ns: i64,
}
