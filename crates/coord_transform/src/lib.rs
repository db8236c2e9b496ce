//! # Coordinate Transform
//!
//! Pure conversions of rigid poses between the host convention and the
//! tracking engine's convention.
//!
//! Two sub-transforms are applied in a fixed order:
//! - axis flip ([`flip_axes`]), applied first on the way to the engine
//! - rigid inversion ([`invert`]), applied when host and engine disagree on
//!   whether a pose is sensor-in-world or world-in-sensor
//!
//! `to_engine = invert ∘ flip` and `to_host = flip ∘ invert`.

mod pose;
mod transform;

pub use pose::RigidPose;
pub use transform::{flip_axes, invert, CoordinateTransform};
