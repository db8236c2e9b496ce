//! Rigid pose value type and its matrix form

use contracts::{DevicePose, PoseMatrix};
use nalgebra::{Isometry3, Matrix3, Matrix4, Quaternion, Rotation3, Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};

/// Position plus rotation quaternion in `(x, y, z, w)` order
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidPose {
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

impl Default for RigidPose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl RigidPose {
    pub const IDENTITY: RigidPose = RigidPose {
        position: [0.0; 3],
        rotation: [0.0, 0.0, 0.0, 1.0],
    };

    pub fn new(position: [f32; 3], rotation: [f32; 4]) -> Self {
        Self { position, rotation }
    }

    pub fn from_device_pose(pose: &DevicePose) -> Self {
        Self::new(pose.position, pose.rotation)
    }

    /// Normalized rotation
    pub(crate) fn unit_rotation(&self) -> UnitQuaternion<f32> {
        let [x, y, z, w] = self.rotation;
        UnitQuaternion::new_normalize(Quaternion::new(w, x, y, z))
    }

    pub fn to_isometry(&self) -> Isometry3<f32> {
        let [tx, ty, tz] = self.position;
        Isometry3::from_parts(Translation3::new(tx, ty, tz), self.unit_rotation())
    }

    pub fn from_isometry(iso: &Isometry3<f32>) -> Self {
        let t = iso.translation.vector;
        let q = iso.rotation.quaternion();
        Self::new([t.x, t.y, t.z], [q.i, q.j, q.k, q.w])
    }

    /// 4x4 homogeneous matrix, column-major
    pub fn to_matrix(&self) -> PoseMatrix {
        let mut out = [0.0f32; 16];
        out.copy_from_slice(self.to_isometry().to_homogeneous().as_slice());
        out
    }

    /// Inverse of [`RigidPose::to_matrix`]; the upper 3x3 block is taken as
    /// the rotation and the last column as the translation
    pub fn from_matrix(matrix: &PoseMatrix) -> Self {
        let m = Matrix4::from_column_slice(matrix);
        let r: Matrix3<f32> = m.fixed_view::<3, 3>(0, 0).into_owned();
        let rotation = UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(r));
        let t = m.fixed_view::<3, 1>(0, 3);
        let q = rotation.quaternion();
        Self::new([t[0], t[1], t[2]], [q.i, q.j, q.k, q.w])
    }
}
