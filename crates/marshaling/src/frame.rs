//! Camera frame marshaling

use std::sync::Arc;

use bytes::BytesMut;
use contracts::{CameraFrame, CameraIntrinsics, EngineFrame, RowOrder, RGB_BYTES_PER_PIXEL};
use tracing::{debug, trace};

use crate::{marshal_intrinsics, MarshalError, MarshalMetrics, Result};

/// Frame marshaler
///
/// Produces owned, top-down copies of host frames. The only state kept across
/// calls is one scanline of scratch space, resized when the resolution
/// changes.
#[derive(Debug)]
pub struct FrameMarshaler {
    row_order: RowOrder,
    scratch: Vec<u8>,
    /// Resolution the scratch buffer was sized for
    scratch_dims: Option<(u32, u32)>,
    metrics: Arc<MarshalMetrics>,
}

impl FrameMarshaler {
    pub fn new(row_order: RowOrder) -> Self {
        Self::with_metrics(row_order, Arc::new(MarshalMetrics::new()))
    }

    pub fn with_metrics(row_order: RowOrder, metrics: Arc<MarshalMetrics>) -> Self {
        Self {
            row_order,
            scratch: Vec::new(),
            scratch_dims: None,
            metrics,
        }
    }

    pub fn row_order(&self) -> RowOrder {
        self.row_order
    }

    pub fn metrics(&self) -> &Arc<MarshalMetrics> {
        &self.metrics
    }

    /// Number of times the scratch scanline was (re)allocated
    pub fn scratch_reallocations(&self) -> u64 {
        self.metrics.snapshot().scratch_reallocations
    }

    /// Validate and copy one frame.
    ///
    /// # Errors
    /// `SizeMismatch` unless `pixels.len() == width * height * 3`; nothing is
    /// copied in that case.
    pub fn marshal_frame(
        &mut self,
        pixels: &[u8],
        width: u32,
        height: u32,
        intrinsics: Option<&CameraIntrinsics>,
        timestamp_ns: i64,
    ) -> Result<EngineFrame> {
        if let Err(e) = check_frame_len(pixels.len(), width, height) {
            self.metrics.record_rejected();
            debug!(width, height, len = pixels.len(), reason = e.reason(), "frame rejected");
            return Err(e);
        }

        let mut owned = BytesMut::from(pixels);
        if self.row_order == RowOrder::BottomUp {
            self.flip_rows(&mut owned, width, height);
        }

        self.metrics.record_marshaled();
        trace!(width, height, timestamp_ns, "frame marshaled");

        Ok(EngineFrame {
            pixels: owned.freeze(),
            width,
            height,
            timestamp_ns,
            intrinsics: intrinsics.map(marshal_intrinsics),
        })
    }

    /// [`Self::marshal_frame`] for a typed host frame
    pub fn marshal_camera_frame(&mut self, frame: &CameraFrame) -> Result<EngineFrame> {
        self.marshal_frame(
            &frame.pixels,
            frame.width,
            frame.height,
            frame.intrinsics.as_ref(),
            frame.timestamp_ns,
        )
    }

    fn ensure_scratch(&mut self, width: u32, height: u32, row_len: usize) {
        if self.scratch_dims == Some((width, height)) {
            return;
        }
        self.scratch = vec![0u8; row_len];
        self.scratch_dims = Some((width, height));
        self.metrics.record_reallocation();
        debug!(width, height, row_len, "scratch scanline reallocated");
    }

    /// Swap row `i` with row `height - 1 - i`, in place
    fn flip_rows(&mut self, buf: &mut [u8], width: u32, height: u32) {
        let row_len = width as usize * RGB_BYTES_PER_PIXEL;
        self.ensure_scratch(width, height, row_len);

        let rows = height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (head, tail) = buf.split_at_mut(bottom * row_len);
            let top_row = &mut head[top * row_len..(top + 1) * row_len];
            let bottom_row = &mut tail[..row_len];

            self.scratch.copy_from_slice(top_row);
            top_row.copy_from_slice(bottom_row);
            bottom_row.copy_from_slice(&self.scratch);
        }
        self.metrics.record_flip();
    }
}

/// Checked `width * height * 3` against the buffer length
fn check_frame_len(len: usize, width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 {
        return Err(MarshalError::EmptyFrame { width, height });
    }
    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(RGB_BYTES_PER_PIXEL));
    if expected != Some(len) {
        return Err(MarshalError::SizeMismatch {
            width,
            height,
            expected,
            actual: len,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Each pixel of row `r` is `(r, r, r)`
    fn row_tagged(width: u32, height: u32) -> Vec<u8> {
        (0..height)
            .flat_map(|r| std::iter::repeat(r as u8).take(width as usize * 3))
            .collect()
    }

    #[test]
    fn test_top_down_copies_verbatim() {
        let mut marshaler = FrameMarshaler::new(RowOrder::TopDown);
        let pixels = row_tagged(4, 3);
        let frame = marshaler.marshal_frame(&pixels, 4, 3, None, 10).unwrap();
        assert_eq!(&frame.pixels[..], &pixels[..]);
        assert_eq!(frame.timestamp_ns, 10);
        assert!(frame.intrinsics.is_none());
        assert_eq!(marshaler.scratch_reallocations(), 0);
    }

    #[test]
    fn test_bottom_up_flips_rows() {
        let mut marshaler = FrameMarshaler::new(RowOrder::BottomUp);
        let pixels = row_tagged(2, 5);
        let frame = marshaler.marshal_frame(&pixels, 2, 5, None, 0).unwrap();
        let first_bytes: Vec<u8> = frame.pixels.chunks(6).map(|row| row[0]).collect();
        assert_eq!(first_bytes, vec![4, 3, 2, 1, 0]);
        // the caller's buffer is untouched
        assert_eq!(pixels[0], 0);
    }

    #[test]
    fn test_scratch_reallocated_only_on_resolution_change() {
        let mut marshaler = FrameMarshaler::new(RowOrder::BottomUp);
        let small = row_tagged(4, 4);
        let large = row_tagged(8, 2);

        for _ in 0..3 {
            marshaler.marshal_frame(&small, 4, 4, None, 0).unwrap();
        }
        assert_eq!(marshaler.scratch_reallocations(), 1);

        marshaler.marshal_frame(&large, 8, 2, None, 0).unwrap();
        marshaler.marshal_frame(&large, 8, 2, None, 0).unwrap();
        assert_eq!(marshaler.scratch_reallocations(), 2);

        // same row length, different height still counts as a resolution change
        let tall = row_tagged(8, 3);
        marshaler.marshal_frame(&tall, 8, 3, None, 0).unwrap();
        assert_eq!(marshaler.scratch_reallocations(), 3);
        assert_eq!(marshaler.metrics().snapshot().frames_flipped, 6);
    }

    #[test]
    fn test_rejects_any_size_mismatch() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut marshaler = FrameMarshaler::new(RowOrder::BottomUp);
        for _ in 0..200 {
            let width = rng.random_range(1..32u32);
            let height = rng.random_range(1..32u32);
            let expected = (width * height * 3) as usize;
            let len = loop {
                let candidate = rng.random_range(0..expected * 2);
                if candidate != expected {
                    break candidate;
                }
            };
            let pixels = vec![0u8; len];
            let err = marshaler
                .marshal_frame(&pixels, width, height, None, 0)
                .unwrap_err();
            assert!(matches!(err, MarshalError::SizeMismatch { actual, .. } if actual == len));
        }
        let snapshot = marshaler.metrics().snapshot();
        assert_eq!(snapshot.frames_rejected, 200);
        assert_eq!(snapshot.frames_marshaled, 0);
        assert_eq!(snapshot.scratch_reallocations, 0);
    }

    #[test]
    fn test_overflow_is_a_mismatch() {
        let mut marshaler = FrameMarshaler::new(RowOrder::TopDown);
        let err = marshaler
            .marshal_frame(&[0u8; 3], u32::MAX, u32::MAX, None, 0)
            .unwrap_err();
        assert!(matches!(
            err,
            MarshalError::SizeMismatch { expected: None, .. }
        ));
    }

    #[test]
    fn test_zero_dimension_rejected() {
        let mut marshaler = FrameMarshaler::new(RowOrder::TopDown);
        let err = marshaler.marshal_frame(&[], 0, 10, None, 0).unwrap_err();
        assert_eq!(err, MarshalError::EmptyFrame { width: 0, height: 10 });
    }

    #[test]
    fn test_camera_frame_carries_intrinsics() {
        let intrinsics =
            CameraIntrinsics::new(2, 2, [100.0, 100.0], [1.0, 1.0], &[]).unwrap();
        let frame = CameraFrame {
            pixels: Bytes::from(vec![9u8; 12]),
            width: 2,
            height: 2,
            timestamp_ns: 5,
            intrinsics: Some(intrinsics),
        };
        let mut marshaler = FrameMarshaler::new(RowOrder::TopDown);
        let engine_frame = marshaler.marshal_camera_frame(&frame).unwrap();
        let wire = engine_frame.intrinsics.unwrap();
        assert_eq!((wire.width, wire.fx), (2.0, 100.0));
    }
}
