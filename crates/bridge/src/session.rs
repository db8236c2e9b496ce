//! Session factory
//!
//! Construct one factory per process. Each factory admits at most one
//! Running bridge at a time; bridges from different factories are
//! independent, which keeps parallel tests isolated.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use contracts::{CameraMode, LifecycleObserver, NoopLifecycleObserver, TrackingEngine};
use tracing::debug;

use crate::CallBridge;

const NO_SESSION: u64 = 0;

/// Running-session slot shared by every bridge of one factory
#[derive(Debug, Default)]
pub(crate) struct SessionSlot {
    running: AtomicU64,
}

impl SessionSlot {
    /// Claim the slot for `bridge_id`; returns the current holder on failure
    pub(crate) fn claim(&self, bridge_id: u64) -> Result<(), u64> {
        self.running
            .compare_exchange(NO_SESSION, bridge_id, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
    }

    /// Release the slot if `bridge_id` holds it
    pub(crate) fn release(&self, bridge_id: u64) {
        let _ = self.running.compare_exchange(
            bridge_id,
            NO_SESSION,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    pub(crate) fn holder(&self) -> Option<u64> {
        match self.running.load(Ordering::Acquire) {
            NO_SESSION => None,
            id => Some(id),
        }
    }
}

/// Creates call bridges that share one Running-session slot
#[derive(Debug, Default)]
pub struct SessionFactory {
    slot: Arc<SessionSlot>,
    next_id: AtomicU64,
}

impl SessionFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// New Uninitialized bridge owning `engine`
    pub fn create_bridge<E: TrackingEngine>(
        &self,
        engine: E,
        mode: CameraMode,
        observer: Arc<dyn LifecycleObserver>,
    ) -> CallBridge<E> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        debug!(bridge_id = id, "bridge created");
        CallBridge::new(id, Arc::clone(&self.slot), engine, mode, observer)
    }

    /// [`Self::create_bridge`] without a lifecycle observer
    pub fn create_bridge_silent<E: TrackingEngine>(
        &self,
        engine: E,
        mode: CameraMode,
    ) -> CallBridge<E> {
        self.create_bridge(engine, mode, Arc::new(NoopLifecycleObserver))
    }

    /// Whether a bridge from this factory is Running
    pub fn has_running_session(&self) -> bool {
        self.slot.holder().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_single_holder() {
        let slot = SessionSlot::default();
        assert!(slot.claim(1).is_ok());
        assert_eq!(slot.claim(2), Err(1));
        slot.release(2);
        assert_eq!(slot.holder(), Some(1));
        slot.release(1);
        assert_eq!(slot.holder(), None);
        assert!(slot.claim(2).is_ok());
    }
}
