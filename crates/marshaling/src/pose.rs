//! Device pose marshaling

use contracts::{DevicePose, EngineLocator};

use crate::{MarshalError, Result};

const POSITION_LEN: usize = 3;
const ROTATION_LEN: usize = 4;

/// Copy a host pose into the engine's locator.
///
/// Only array lengths are checked; quaternion normalization is the capture
/// source's responsibility.
#[inline]
pub fn marshal_pose(
    position: &[f32],
    rotation: &[f32],
    timestamp_ns: i64,
) -> Result<EngineLocator> {
    let position: [f32; POSITION_LEN] =
        position.try_into().map_err(|_| MarshalError::MalformedPose {
            field: "position",
            expected: POSITION_LEN,
            actual: position.len(),
        })?;
    let rotation: [f32; ROTATION_LEN] =
        rotation.try_into().map_err(|_| MarshalError::MalformedPose {
            field: "rotation",
            expected: ROTATION_LEN,
            actual: rotation.len(),
        })?;

    Ok(EngineLocator {
        position,
        rotation,
        timestamp_ns,
    })
}

/// Typed poses are already the right shape
#[inline]
pub fn locator_from_pose(pose: &DevicePose) -> EngineLocator {
    EngineLocator {
        position: pose.position,
        rotation: pose.rotation,
        timestamp_ns: pose.timestamp_ns,
    }
}
