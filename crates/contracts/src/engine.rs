//! TrackingEngine trait - the engine's ingestion and query contract
//!
//! The tracking engine is an opaque collaborator. This trait is the whole
//! surface the bridge is allowed to touch; a native binding and the mock
//! engine used in tests both implement it.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{
    CameraMode, EngineFrame, EngineLocator, EngineResult, EngineSnapshot, IntrinsicsWire,
    ObserverHandle, ObserverSpec, SnapshotId, TargetCategory,
};

/// Engine creation parameters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// License key handed to the engine
    pub license_key: String,
}

/// External camera callbacks the engine drives during start/stop
///
/// Implemented by the driver lifecycle controller. The engine calls
/// `open`, picks one of `supported_modes`, then `start`; on shutdown it calls
/// `stop` and `close`.
pub trait ExternalCamera {
    /// Prepare the camera. Returns false if it cannot be opened.
    fn open(&mut self) -> bool;

    /// Modes the camera can deliver
    fn supported_modes(&self) -> Vec<CameraMode>;

    /// Begin delivering frames in `mode`
    fn start(&mut self, mode: CameraMode) -> bool;

    /// Stop delivering frames
    fn stop(&mut self) -> bool;

    /// Release the camera
    fn close(&mut self) -> bool;
}

/// Tracking engine contract
///
/// # Design Principles
///
/// 1. **Single owner**: exactly one bridge owns an engine value; every call
///    is serialized by that bridge.
/// 2. **Copy-in, copy-out**: ingestion borrows marshaled inputs for the
///    duration of the call only; snapshots are returned as owned data.
/// 3. **Scoped state**: each `acquire_latest_state` must be matched by one
///    `release_state` with the returned id.
///
/// # Example
///
/// ```ignore
/// engine.configure(&EngineConfig { license_key })?;
/// engine.start(&mut driver)?;
/// engine.ingest_pose(&locator)?;
/// engine.ingest_frame(&frame)?;
/// let snapshot = engine.acquire_latest_state()?;
/// // ... read snapshot.observations ...
/// engine.release_state(snapshot.id);
/// ```
pub trait TrackingEngine: Send {
    /// Create the engine instance. Fails on invalid credentials.
    fn configure(&mut self, config: &EngineConfig) -> EngineResult<()>;

    /// Start processing; drives the camera's `open`/`start` callbacks
    fn start(&mut self, camera: &mut dyn ExternalCamera) -> EngineResult<()>;

    /// Stop processing; drives the camera's `stop` callback
    fn stop(&mut self, camera: &mut dyn ExternalCamera);

    /// Destroy the engine instance. Safe to call when not configured.
    fn teardown(&mut self, camera: &mut dyn ExternalCamera);

    /// Replace the cached camera intrinsics
    fn set_intrinsics(&mut self, intrinsics: &IntrinsicsWire) -> EngineResult<()>;

    /// Ingest the device pose for a timestamp
    fn ingest_pose(&mut self, locator: &EngineLocator) -> EngineResult<()>;

    /// Ingest the camera frame for a timestamp
    fn ingest_frame(&mut self, frame: &EngineFrame) -> EngineResult<()>;

    /// Acquire the latest published state
    fn acquire_latest_state(&mut self) -> EngineResult<EngineSnapshot>;

    /// Release a snapshot returned by `acquire_latest_state`
    fn release_state(&mut self, id: SnapshotId) -> EngineResult<()>;

    /// Read target info from a database; returns the target count
    fn load_database(&mut self, category: TargetCategory, path: &Path) -> EngineResult<usize>;

    /// Create an observer for one target
    fn create_observer(&mut self, spec: &ObserverSpec) -> EngineResult<ObserverHandle>;

    /// Destroy an observer; unknown handles are ignored
    fn destroy_observer(&mut self, handle: ObserverHandle);
}
