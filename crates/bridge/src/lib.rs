//! # Bridge
//!
//! Frame/pose synchronization bridge between a host capture pipeline and a
//! tracking engine.
//!
//! Responsibilities:
//! - Own the engine session (`CallBridge`), one Running session per factory
//! - Answer the engine's external-camera callbacks (`DriverController`)
//! - Sequence pose(T) before frame(T) and detect violations (`Sequencer`)
//! - Hand out scoped state snapshots (`StateGuard`)
//! - Drive feeds from a `CaptureSource` once per frame (`CaptureLoop`)
//!
//! ## Usage Example
//!
//! ```ignore
//! use bridge::{MockTrackingEngine, Sequencer, SequencerConfig, SessionFactory};
//!
//! let factory = SessionFactory::new();
//! let bridge = factory.create_bridge_silent(MockTrackingEngine::new(), mode);
//! bridge.initialize(&blueprint.to_engine_config())?;
//!
//! let mut sequencer = Sequencer::new(SequencerConfig::from_blueprint(&blueprint));
//! sequencer.feed_pose(&bridge, &pose);
//! sequencer.feed_frame(&bridge, &frame);
//!
//! let state = bridge.acquire_latest_state()?;
//! for observation in state.observations() { /* ... */ }
//! ```

use std::sync::{Mutex, MutexGuard, PoisonError};

mod call_bridge;
mod capture;
mod driver;
mod error;
mod guard;
pub mod mock_engine;
mod sequencer;
mod session;

pub use call_bridge::CallBridge;
pub use capture::{CaptureLoop, SyntheticCapture};
pub use driver::DriverController;
pub use error::{InitError, Result, SessionError};
pub use guard::StateGuard;
pub use mock_engine::{MockEngineConfig, MockEngineControl, MockTrackingEngine};
pub use sequencer::{Sequencer, SequencerConfig, SequencerStats};
pub use session::SessionFactory;

/// Lock, recovering the data if a previous holder panicked
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
