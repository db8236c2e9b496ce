//! Intrinsics wire layout: `[width, height, fx, fy, cx, cy, d0..d7]`

use bytes::Bytes;
use contracts::{CameraIntrinsics, IntrinsicsWire, INTRINSICS_WIRE_LEN};

use crate::{MarshalError, Result};

#[inline]
pub fn marshal_intrinsics(intrinsics: &CameraIntrinsics) -> IntrinsicsWire {
    IntrinsicsWire::from(intrinsics)
}

/// Decode a 14-float array as handed over by the host.
pub fn parse_intrinsics(values: &[f32]) -> Result<CameraIntrinsics> {
    let wire = IntrinsicsWire::from_slice(values).ok_or(MarshalError::IntrinsicsLength {
        expected: INTRINSICS_WIRE_LEN,
        actual: values.len(),
    })?;
    CameraIntrinsics::from_wire(&wire).map_err(|e| MarshalError::InvalidIntrinsics {
        message: e.to_string(),
    })
}

/// Raw little-endian bytes of the wire struct, as the engine binary reads them
#[inline]
pub fn intrinsics_to_bytes(wire: &IntrinsicsWire) -> Bytes {
    Bytes::copy_from_slice(bytemuck::bytes_of(wire))
}
