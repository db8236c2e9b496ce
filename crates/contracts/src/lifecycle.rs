//! Session and driver lifecycle states, plus the caller-facing observer.

use serde::{Deserialize, Serialize};

use crate::CameraMode;

/// Engine session lifecycle
///
/// `Uninitialized → Initializing → Running → ShuttingDown → Uninitialized`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionState {
    Uninitialized = 0,
    Initializing = 1,
    Running = 2,
    ShuttingDown = 3,
}

impl SessionState {
    /// Decode the value stored in an `AtomicU8`
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => SessionState::Initializing,
            2 => SessionState::Running,
            3 => SessionState::ShuttingDown,
            _ => SessionState::Uninitialized,
        }
    }
}

/// External camera driver state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverState {
    Closed,
    Open,
    Started,
    Stopped,
}

/// Caller-supplied lifecycle observer
///
/// Invoked synchronously from within the driver controller, on whichever
/// thread drove the transition. Implementations must not call back into the
/// bridge.
pub trait LifecycleObserver: Send + Sync {
    /// Camera started in `mode`; feeds are now accepted
    fn on_ready(&self, mode: &CameraMode) {
        let _ = mode;
    }

    /// Start or negotiation failed
    fn on_failed(&self, reason: &str) {
        let _ = reason;
    }

    /// Camera stopped; feeds are rejected until restarted
    fn on_stopped(&self) {}
}

/// Observer that ignores every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLifecycleObserver;

impl LifecycleObserver for NoopLifecycleObserver {}
