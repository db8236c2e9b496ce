//! Camera-side data: intrinsics, frames, modes
//!
//! Host frames are RGB triplets; the engine-facing copies live in
//! [`EngineFrame`] and [`IntrinsicsWire`].

use bytemuck::{Pod, Zeroable};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::ContractError;

/// Number of distortion coefficients carried on the wire
pub const DISTORTION_COEFFS: usize = 8;

/// Floats in the intrinsics wire layout: `[w, h, fx, fy, cx, cy, d0..d7]`
pub const INTRINSICS_WIRE_LEN: usize = 6 + DISTORTION_COEFFS;

/// Bytes per RGB pixel
pub const RGB_BYTES_PER_PIXEL: usize = 3;

/// Camera optical parameters
///
/// Immutable once constructed. Use [`CameraIntrinsics::new`] so the
/// positivity invariants are checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    pub width: u32,
    pub height: u32,
    /// Focal length in pixels (fx, fy)
    pub focal_length: [f32; 2],
    /// Principal point in pixels (cx, cy)
    pub principal_point: [f32; 2],
    /// Distortion coefficients, zero padded
    #[serde(default)]
    pub distortion: [f32; DISTORTION_COEFFS],
}

impl CameraIntrinsics {
    /// Build intrinsics, zero-padding `distortion` up to 8 coefficients.
    ///
    /// # Errors
    /// `InvalidIntrinsics` for zero resolution, non-positive focal length or
    /// more than 8 distortion coefficients.
    pub fn new(
        width: u32,
        height: u32,
        focal_length: [f32; 2],
        principal_point: [f32; 2],
        distortion: &[f32],
    ) -> Result<Self, ContractError> {
        if distortion.len() > DISTORTION_COEFFS {
            return Err(ContractError::invalid_intrinsics(
                "distortion",
                format!(
                    "at most {DISTORTION_COEFFS} coefficients, got {}",
                    distortion.len()
                ),
            ));
        }
        let mut padded = [0.0f32; DISTORTION_COEFFS];
        padded[..distortion.len()].copy_from_slice(distortion);

        let intrinsics = Self {
            width,
            height,
            focal_length,
            principal_point,
            distortion: padded,
        };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Check the invariants on an already-built value (e.g. after deserialize).
    pub fn validate(&self) -> Result<(), ContractError> {
        if self.width == 0 || self.height == 0 {
            return Err(ContractError::invalid_intrinsics(
                "width/height",
                format!("resolution must be > 0, got {}x{}", self.width, self.height),
            ));
        }
        let [fx, fy] = self.focal_length;
        if !(fx > 0.0 && fy > 0.0) || !fx.is_finite() || !fy.is_finite() {
            return Err(ContractError::invalid_intrinsics(
                "focal_length",
                format!("focal length must be finite and > 0, got ({fx}, {fy})"),
            ));
        }
        if self.principal_point.iter().any(|c| !c.is_finite())
            || self.distortion.iter().any(|c| !c.is_finite())
        {
            return Err(ContractError::invalid_intrinsics(
                "principal_point/distortion",
                "values must be finite",
            ));
        }
        Ok(())
    }
}

/// Intrinsics in the engine's 14-float wire layout
///
/// `#[repr(C)]` so the struct is bit-identical to `[f32; 14]`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct IntrinsicsWire {
    pub width: f32,
    pub height: f32,
    pub fx: f32,
    pub fy: f32,
    pub cx: f32,
    pub cy: f32,
    pub distortion: [f32; DISTORTION_COEFFS],
}

impl IntrinsicsWire {
    /// View a 14-float array as the wire struct, bit for bit
    pub fn from_array(values: [f32; INTRINSICS_WIRE_LEN]) -> Self {
        bytemuck::cast(values)
    }

    /// `None` unless `values` has exactly 14 floats
    pub fn from_slice(values: &[f32]) -> Option<Self> {
        <[f32; INTRINSICS_WIRE_LEN]>::try_from(values)
            .ok()
            .map(Self::from_array)
    }

    pub fn to_array(self) -> [f32; INTRINSICS_WIRE_LEN] {
        bytemuck::cast(self)
    }
}

impl From<&CameraIntrinsics> for IntrinsicsWire {
    fn from(k: &CameraIntrinsics) -> Self {
        Self {
            width: k.width as f32,
            height: k.height as f32,
            fx: k.focal_length[0],
            fy: k.focal_length[1],
            cx: k.principal_point[0],
            cy: k.principal_point[1],
            distortion: k.distortion,
        }
    }
}

impl CameraIntrinsics {
    /// Decode and validate the wire layout
    pub fn from_wire(wire: &IntrinsicsWire) -> Result<Self, ContractError> {
        let width = wire_dimension("width", wire.width)?;
        let height = wire_dimension("height", wire.height)?;
        let intrinsics = Self {
            width,
            height,
            focal_length: [wire.fx, wire.fy],
            principal_point: [wire.cx, wire.cy],
            distortion: wire.distortion,
        };
        intrinsics.validate()?;
        Ok(intrinsics)
    }

    /// Decode `[width, height, fx, fy, cx, cy, d0..d7]`
    pub fn from_wire_slice(values: &[f32]) -> Result<Self, ContractError> {
        let wire = IntrinsicsWire::from_slice(values).ok_or_else(|| {
            ContractError::invalid_intrinsics(
                "length",
                format!("expected {INTRINSICS_WIRE_LEN} floats, got {}", values.len()),
            )
        })?;
        Self::from_wire(&wire)
    }
}

fn wire_dimension(field: &str, value: f32) -> Result<u32, ContractError> {
    if !value.is_finite() || value < 1.0 || value.fract() != 0.0 || value > u32::MAX as f32 {
        return Err(ContractError::invalid_intrinsics(
            field,
            format!("expected a positive integer, got {value}"),
        ));
    }
    Ok(value as u32)
}

/// One captured camera frame
#[derive(Debug, Clone)]
pub struct CameraFrame {
    /// Contiguous RGB triplets, row-major
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
    /// Capture timestamp; should match a previously fed pose
    pub timestamp_ns: i64,
    /// Per-frame intrinsics; the cached value is used when absent
    pub intrinsics: Option<CameraIntrinsics>,
}

/// Scanline order of a host pixel buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// First row is the top of the image (engine order)
    #[default]
    TopDown,
    /// First row is the bottom of the image
    BottomUp,
}

/// Pixel format of a camera mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    #[default]
    Rgb888,
    Rgba8888,
    Nv21,
}

impl PixelFormat {
    /// Whether the marshaling layer can feed this format
    pub fn is_ingestible(self) -> bool {
        matches!(self, PixelFormat::Rgb888)
    }
}

/// Camera mode advertised to the engine
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraMode {
    pub width: u32,
    pub height: u32,
    pub fps: f32,
    #[serde(default)]
    pub pixel_format: PixelFormat,
}

impl CameraMode {
    /// Expected byte length of one frame in this mode
    pub fn frame_len(&self) -> Option<usize> {
        (self.width as usize)
            .checked_mul(self.height as usize)?
            .checked_mul(RGB_BYTES_PER_PIXEL)
    }
}

/// Frame marshaled for the engine: owned, top-down, size-checked
#[derive(Debug, Clone)]
pub struct EngineFrame {
    pub pixels: Bytes,
    pub width: u32,
    pub height: u32,
    pub timestamp_ns: i64,
    /// Per-frame intrinsics override, if the host supplied one
    pub intrinsics: Option<IntrinsicsWire>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsics_pads_distortion() {
        let k = CameraIntrinsics::new(1280, 960, [1024.0, 960.0], [640.0, 480.0], &[0.1, -0.2])
            .unwrap();
        assert_eq!(k.distortion, [0.1, -0.2, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_intrinsics_rejects_bad_values() {
        assert!(CameraIntrinsics::new(0, 960, [1.0, 1.0], [0.0, 0.0], &[]).is_err());
        assert!(CameraIntrinsics::new(10, 10, [0.0, 1.0], [0.0, 0.0], &[]).is_err());
        assert!(CameraIntrinsics::new(10, 10, [1.0, 1.0], [0.0, 0.0], &[0.0; 9]).is_err());
    }

    #[test]
    fn test_wire_size_matches_layout() {
        assert_eq!(
            std::mem::size_of::<IntrinsicsWire>(),
            INTRINSICS_WIRE_LEN * std::mem::size_of::<f32>()
        );
    }

    #[test]
    fn test_wire_layout_order() {
        let k = CameraIntrinsics::new(640, 480, [500.0, 501.0], [320.0, 240.0], &[0.5]).unwrap();
        let wire = IntrinsicsWire::from(&k).to_array();
        assert_eq!(&wire[..7], &[640.0, 480.0, 500.0, 501.0, 320.0, 240.0, 0.5]);
        assert_eq!(CameraIntrinsics::from_wire_slice(&wire).unwrap(), k);
    }

    #[test]
    fn test_wire_rejects_fractional_width() {
        let mut wire = [0.0f32; INTRINSICS_WIRE_LEN];
        wire[..6].copy_from_slice(&[640.5, 480.0, 500.0, 500.0, 320.0, 240.0]);
        assert!(CameraIntrinsics::from_wire_slice(&wire).is_err());
        assert!(CameraIntrinsics::from_wire_slice(&wire[..13]).is_err());
    }

    #[test]
    fn test_mode_frame_len() {
        let mode = CameraMode {
            width: 4,
            height: 2,
            fps: 30.0,
            pixel_format: PixelFormat::Rgb888,
        };
        assert_eq!(mode.frame_len(), Some(24));
        assert!(PixelFormat::Rgb888.is_ingestible());
        assert!(!PixelFormat::Nv21.is_ingestible());
    }
}
