//! # Buffer Marshaling
//!
//! Converts host pixel, pose and intrinsics buffers into the exact layouts
//! the tracking engine ingests.
//!
//! Responsibilities:
//! - Validate buffer sizes before anything reaches the engine
//! - Own the copies handed across the boundary
//! - Flip bottom-up frames to top-down with one reusable scanline buffer
//! - Preserve the 14-float intrinsics layout bit for bit
//!
//! ## Usage Example
//!
//! ```ignore
//! use marshaling::{FrameMarshaler, marshal_pose};
//!
//! let mut marshaler = FrameMarshaler::new(RowOrder::BottomUp);
//! let locator = marshal_pose(&position, &rotation, ts)?;
//! let frame = marshaler.marshal_frame(&pixels, 640, 480, None, ts)?;
//! ```

mod error;
mod frame;
mod intrinsics;
mod metrics;
mod pose;

pub use error::{MarshalError, Result};
pub use frame::FrameMarshaler;
pub use intrinsics::{intrinsics_to_bytes, marshal_intrinsics, parse_intrinsics};
pub use metrics::{MarshalMetrics, MarshalMetricsSnapshot};
pub use pose::{locator_from_pose, marshal_pose};
