//! Scoped engine state snapshot

use std::ops::Deref;

use contracts::{EngineSnapshot, RawObservation, SnapshotId, TrackingEngine};

use crate::CallBridge;

/// Engine state snapshot, released exactly once
///
/// Released on [`StateGuard::release`] or when dropped, including on early
/// return and unwinding. Never hold a guard across frames.
#[must_use = "dropping the guard releases the snapshot immediately"]
pub struct StateGuard<'a, E: TrackingEngine> {
    bridge: &'a CallBridge<E>,
    snapshot: EngineSnapshot,
    released: bool,
}

impl<'a, E: TrackingEngine> StateGuard<'a, E> {
    pub(crate) fn new(bridge: &'a CallBridge<E>, snapshot: EngineSnapshot) -> Self {
        Self {
            bridge,
            snapshot,
            released: false,
        }
    }

    pub fn id(&self) -> SnapshotId {
        self.snapshot.id
    }

    pub fn observations(&self) -> &[RawObservation] {
        &self.snapshot.observations
    }

    /// Release now instead of at end of scope
    pub fn release(mut self) {
        self.release_once();
    }

    fn release_once(&mut self) {
        if !self.released {
            self.released = true;
            self.bridge.release_snapshot(self.snapshot.id);
        }
    }
}

impl<E: TrackingEngine> Deref for StateGuard<'_, E> {
    type Target = EngineSnapshot;

    fn deref(&self) -> &Self::Target {
        &self.snapshot
    }
}

impl<E: TrackingEngine> Drop for StateGuard<'_, E> {
    fn drop(&mut self) {
        self.release_once();
    }
}

impl<E: TrackingEngine> std::fmt::Debug for StateGuard<'_, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateGuard")
            .field("id", &self.snapshot.id)
            .field("observations", &self.snapshot.observations.len())
            .field("released", &self.released)
            .finish()
    }
}
