//! Trackables, observers and observations

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::TargetName;

/// Category of trackable target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetCategory {
    /// Planar image target
    Planar,
    /// 3-D model/object target
    Model,
}

impl TargetCategory {
    pub const ALL: [TargetCategory; 2] = [TargetCategory::Planar, TargetCategory::Model];

    pub fn as_str(self) -> &'static str {
        match self {
            TargetCategory::Planar => "planar",
            TargetCategory::Model => "model",
        }
    }
}

impl fmt::Display for TargetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-frame tracking status reported by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingStatus {
    NotTracked,
    Tracked,
    ExtendedTracked,
}

impl TrackingStatus {
    /// Tracked or extended-tracked
    #[inline]
    pub fn is_tracking(self) -> bool {
        matches!(self, TrackingStatus::Tracked | TrackingStatus::ExtendedTracked)
    }
}

/// 4x4 homogeneous transform, column-major
pub type PoseMatrix = [f32; 16];

/// Column-major identity
pub const IDENTITY_MATRIX: PoseMatrix = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// One query result for one observer
///
/// Ephemeral: rebuilt from the latest snapshot on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingObservation {
    pub target_name: TargetName,
    pub category: TargetCategory,
    pub pose: PoseMatrix,
    pub status: TrackingStatus,
}

/// Registration lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationState {
    Pending,
    Active,
    Destroyed,
}

/// Caller-requested trackable registration
#[derive(Debug, Clone, PartialEq)]
pub struct TrackableRegistration {
    pub name: TargetName,
    pub category: TargetCategory,
    pub database_path: PathBuf,
    pub guide_view_name: Option<String>,
    pub state: RegistrationState,
}

/// Opaque engine-side observer handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverHandle(pub u64);

/// Opaque engine-side snapshot handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SnapshotId(pub u64);

/// Parameters for creating one engine observer
#[derive(Debug, Clone, PartialEq)]
pub struct ObserverSpec {
    pub category: TargetCategory,
    pub database_path: PathBuf,
    pub target_name: TargetName,
    /// Model targets only
    pub guide_view_name: Option<String>,
}

/// Observation as enumerated from an engine snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub observer: ObserverHandle,
    pub category: TargetCategory,
    pub target_name: TargetName,
    pub pose: PoseMatrix,
    pub status: TrackingStatus,
}

/// Immutable view of the engine's latest computed observations
///
/// Must be handed back through `release_state` exactly once.
#[derive(Debug, Clone)]
pub struct EngineSnapshot {
    pub id: SnapshotId,
    /// Engine-provided order
    pub observations: Vec<RawObservation>,
}
