//! # Contracts
//!
//! Frozen interface contracts, defining the data model and traits shared by
//! every bridge crate. Business crates depend on this crate only; reverse
//! dependencies are prohibited.
//!
//! ## Time Model
//! - Capture timestamps are `i64` nanoseconds on the host clock
//! - A frame's timestamp should equal the timestamp of a pose fed before it

mod blueprint;
mod camera;
mod capture;
mod convention;
mod engine;
mod error;
mod lifecycle;
mod pose;
mod target_name;
mod tracking;

pub use blueprint::*;
pub use camera::*;
pub use capture::{CaptureSample, CaptureSource};
pub use convention::*;
pub use engine::{EngineConfig, ExternalCamera, TrackingEngine};
pub use error::*;
pub use lifecycle::*;
pub use pose::*;
pub use target_name::TargetName;
pub use tracking::*;
