//! Marshaling counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Marshaling counters, shared by reference with whoever reports them
#[derive(Debug, Default)]
pub struct MarshalMetrics {
    /// Frames copied and handed out
    pub frames_marshaled: AtomicU64,

    /// Frames rejected before any copy
    pub frames_rejected: AtomicU64,

    /// Frames that needed a row-order flip
    pub frames_flipped: AtomicU64,

    /// Scratch scanline reallocations
    pub scratch_reallocations: AtomicU64,
}

impl MarshalMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_marshaled(&self) {
        self.frames_marshaled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.frames_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flip(&self) {
        self.frames_flipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_reallocation(&self) {
        self.scratch_reallocations.fetch_add(1, Ordering::Relaxed);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MarshalMetricsSnapshot {
        MarshalMetricsSnapshot {
            frames_marshaled: self.frames_marshaled.load(Ordering::Relaxed),
            frames_rejected: self.frames_rejected.load(Ordering::Relaxed),
            frames_flipped: self.frames_flipped.load(Ordering::Relaxed),
            scratch_reallocations: self.scratch_reallocations.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarshalMetricsSnapshot {
    pub frames_marshaled: u64,
    pub frames_rejected: u64,
    pub frames_flipped: u64,
    pub scratch_reallocations: u64,
}
