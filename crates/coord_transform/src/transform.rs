//! Host ↔ engine pose conversion

use contracts::{AxisFlip, DevicePose, OffsetMode, PoseMatrix, TransformConfig};
use nalgebra::Vector3;

use crate::RigidPose;

/// Apply the axis convention change. Involutive.
#[inline]
pub fn flip_axes(pose: &RigidPose, flip: AxisFlip) -> RigidPose {
    match flip {
        AxisFlip::Identity => *pose,
        AxisFlip::RotateX180 => {
            let [px, py, pz] = pose.position;
            let [x, y, z, w] = pose.rotation;
            RigidPose::new([px, -py, -pz], [w, -z, -y, x])
        }
    }
}

/// Rigid inversion: `q → q*`, `t → -Rᵀ·t`
#[inline]
pub fn invert(pose: &RigidPose) -> RigidPose {
    let [x, y, z, w] = pose.rotation;
    let t = Vector3::from(pose.position);
    let inv_t = -pose.unit_rotation().inverse_transform_vector(&t);
    RigidPose::new([inv_t.x, inv_t.y, inv_t.z], [-x, -y, -z, w])
}

/// Configured conversion between host and engine conventions
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateTransform {
    config: TransformConfig,
}

impl CoordinateTransform {
    pub fn new(config: TransformConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    fn needs_inversion(&self) -> bool {
        self.config.host_semantics != self.config.engine_semantics
    }

    /// Optical offset rotated into the parent frame of `pose`
    fn offset_in_parent(&self, pose: &RigidPose) -> Option<Vector3<f32>> {
        match self.config.optical_offset.mode {
            OffsetMode::Ignore => None,
            OffsetMode::FoldIntoPose => {
                let offset = Vector3::from(self.config.optical_offset.offset);
                Some(pose.unit_rotation().transform_vector(&offset))
            }
        }
    }

    /// Host pose → engine pose: offset fold, then axis flip, then inversion
    pub fn to_engine_convention(&self, pose: &RigidPose) -> RigidPose {
        let mut folded = *pose;
        if let Some(delta) = self.offset_in_parent(pose) {
            for (p, d) in folded.position.iter_mut().zip(delta.iter()) {
                *p += d;
            }
        }

        let flipped = flip_axes(&folded, self.config.axis_flip);
        if self.needs_inversion() {
            invert(&flipped)
        } else {
            flipped
        }
    }

    /// Engine pose → host pose; exact inverse of [`Self::to_engine_convention`]
    pub fn to_host_convention(&self, pose: &RigidPose) -> RigidPose {
        let uninverted = if self.needs_inversion() {
            invert(pose)
        } else {
            *pose
        };

        let mut host = flip_axes(&uninverted, self.config.axis_flip);
        if let Some(delta) = self.offset_in_parent(&host) {
            for (p, d) in host.position.iter_mut().zip(delta.iter()) {
                *p -= d;
            }
        }
        host
    }

    /// Device pose as fed to the engine
    pub fn device_pose_to_engine(&self, pose: &DevicePose) -> DevicePose {
        let converted = self.to_engine_convention(&RigidPose::from_device_pose(pose));
        DevicePose {
            position: converted.position,
            rotation: converted.rotation,
            timestamp_ns: pose.timestamp_ns,
        }
    }

    /// Observation matrix reported by the engine, in host convention
    pub fn matrix_to_host(&self, matrix: &PoseMatrix) -> PoseMatrix {
        self.to_host_convention(&RigidPose::from_matrix(matrix))
            .to_matrix()
    }
}

impl From<TransformConfig> for CoordinateTransform {
    fn from(config: TransformConfig) -> Self {
        Self::new(config)
    }
}
