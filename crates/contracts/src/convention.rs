//! Coordinate convention and sequencing settings shared by the transform,
//! the bridge and the config loader.

use serde::{Deserialize, Serialize};

/// Axis convention change between host and engine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisFlip {
    /// Host and engine share axes
    Identity,
    /// 180° about X: position `(x, -y, -z)`, quaternion `(x,y,z,w) → (w,-z,-y,x)`
    #[default]
    RotateX180,
}

/// What a rigid pose expresses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseSemantics {
    /// Sensor pose expressed in the world frame
    #[default]
    SensorInWorld,
    /// World pose expressed in the sensor frame
    WorldInSensor,
}

/// How the optical-center offset is applied
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetMode {
    #[default]
    Ignore,
    /// `t += R·offset` before the axis flip
    FoldIntoPose,
}

/// Offset of the optical center from the tracking reference, in the host
/// sensor frame (meters)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OpticalOffset {
    #[serde(default)]
    pub mode: OffsetMode,
    #[serde(default)]
    pub offset: [f32; 3],
}

/// Host ↔ engine pose conversion parameters
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    #[serde(default)]
    pub axis_flip: AxisFlip,
    #[serde(default)]
    pub host_semantics: PoseSemantics,
    #[serde(default)]
    pub engine_semantics: PoseSemantics,
    #[serde(default)]
    pub optical_offset: OpticalOffset,
}

/// Reaction to a frame whose pose was never fed, or to a pose timestamp
/// going backwards
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingPolicy {
    /// Forward silently
    Tolerate,
    /// Warn and count, then forward
    #[default]
    Flag,
    /// Panic (test harnesses)
    Assert,
}
