//! Mock tracking engine
//!
//! In-process engine for tests and the CLI. Failures can be injected through
//! [`MockEngineConfig`]; snapshots can be scripted and every call inspected
//! through the shared [`MockEngineControl`] handle.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use contracts::{
    CameraMode, EngineConfig, EngineError, EngineFrame, EngineLocator, EngineResult,
    EngineSnapshot, ExternalCamera, IntrinsicsWire, ObserverHandle, ObserverSpec, RawObservation,
    SnapshotId, TargetCategory, TargetName, TrackingEngine, TrackingStatus, IDENTITY_MATRIX,
    RGB_BYTES_PER_PIXEL,
};
use tracing::{debug, instrument};

use crate::lock;

/// Mock engine configuration
#[derive(Debug, Clone)]
pub struct MockEngineConfig {
    /// Only this key is accepted; `None` accepts any non-empty key
    pub accepted_license: Option<String>,
    /// Known databases: path → target names
    pub databases: HashMap<PathBuf, Vec<String>>,
    /// Fail `start` after configuring
    pub fail_start: bool,
    /// Report every live observer as Tracked unless observations are scripted
    pub auto_track: bool,
}

impl Default for MockEngineConfig {
    fn default() -> Self {
        Self {
            accepted_license: None,
            databases: HashMap::new(),
            fail_start: false,
            auto_track: true,
        }
    }
}

impl MockEngineConfig {
    /// Register a database file and the targets it contains
    pub fn with_database<I, S>(mut self, path: impl Into<PathBuf>, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.databases
            .insert(path.into(), targets.into_iter().map(Into::into).collect());
        self
    }
}

/// One engine call, in the order received
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Configure,
    Start { mode: CameraMode },
    Stop,
    Teardown,
    SetIntrinsics(IntrinsicsWire),
    IngestPose { timestamp_ns: i64 },
    IngestFrame { timestamp_ns: i64, width: u32, height: u32 },
    Acquire(SnapshotId),
    Release(SnapshotId),
    LoadDatabase { category: TargetCategory, path: PathBuf },
    CreateObserver { handle: ObserverHandle, name: TargetName },
    DestroyObserver(ObserverHandle),
}

#[derive(Debug, Default)]
struct ControlState {
    calls: Vec<EngineCall>,
    scripted: Option<Vec<RawObservation>>,
    outstanding: HashSet<SnapshotId>,
    observers: BTreeMap<ObserverHandle, ObserverSpec>,
    configured: bool,
    started: bool,
    intrinsics: Option<IntrinsicsWire>,
    fail_ingest: bool,
    next_snapshot: u64,
    next_observer: u64,
}

/// Shared handle for scripting and inspecting a [`MockTrackingEngine`]
#[derive(Debug, Clone, Default)]
pub struct MockEngineControl {
    state: Arc<Mutex<ControlState>>,
}

impl MockEngineControl {
    /// Every call received so far
    pub fn calls(&self) -> Vec<EngineCall> {
        lock(&self.state).calls.clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.state).calls.clear();
    }

    /// Ingestion calls only (poses and frames)
    pub fn ingestion_calls(&self) -> Vec<EngineCall> {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    EngineCall::IngestPose { .. } | EngineCall::IngestFrame { .. }
                )
            })
            .cloned()
            .collect()
    }

    /// Return exactly these observations from every following snapshot
    pub fn script_observations(&self, observations: Vec<RawObservation>) {
        lock(&self.state).scripted = Some(observations);
    }

    /// Go back to auto-tracking
    pub fn clear_script(&self) {
        lock(&self.state).scripted = None;
    }

    /// Make ingestion calls fail
    pub fn set_fail_ingest(&self, fail: bool) {
        lock(&self.state).fail_ingest = fail;
    }

    pub fn outstanding_snapshots(&self) -> usize {
        lock(&self.state).outstanding.len()
    }

    pub fn live_observers(&self) -> Vec<(ObserverHandle, TargetName)> {
        lock(&self.state)
            .observers
            .iter()
            .map(|(handle, spec)| (*handle, spec.target_name.clone()))
            .collect()
    }

    /// Handle of the live observer for `name`, if any
    pub fn observer_for(&self, category: TargetCategory, name: &str) -> Option<ObserverHandle> {
        lock(&self.state)
            .observers
            .iter()
            .find(|(_, spec)| spec.category == category && spec.target_name == name)
            .map(|(handle, _)| *handle)
    }

    pub fn cached_intrinsics(&self) -> Option<IntrinsicsWire> {
        lock(&self.state).intrinsics
    }

    pub fn is_started(&self) -> bool {
        lock(&self.state).started
    }

    pub fn is_configured(&self) -> bool {
        lock(&self.state).configured
    }
}

/// Build a scripted observation
pub fn scripted_observation(
    observer: ObserverHandle,
    category: TargetCategory,
    name: &str,
    status: TrackingStatus,
) -> RawObservation {
    RawObservation {
        observer,
        category,
        target_name: TargetName::from(name),
        pose: IDENTITY_MATRIX,
        status,
    }
}

/// Mock tracking engine
#[derive(Debug)]
pub struct MockTrackingEngine {
    config: MockEngineConfig,
    control: MockEngineControl,
}

impl MockTrackingEngine {
    pub fn new() -> Self {
        Self::with_config(MockEngineConfig::default())
    }

    pub fn with_config(config: MockEngineConfig) -> Self {
        Self {
            config,
            control: MockEngineControl::default(),
        }
    }

    /// Handle that stays valid after the engine moves into a bridge
    pub fn control(&self) -> MockEngineControl {
        self.control.clone()
    }

    fn ensure_started(state: &ControlState) -> EngineResult<()> {
        if state.started {
            Ok(())
        } else {
            Err(EngineError::NotStarted)
        }
    }

    fn auto_observations(state: &ControlState) -> Vec<RawObservation> {
        state
            .observers
            .iter()
            .map(|(handle, spec)| {
                let mut pose = IDENTITY_MATRIX;
                pose[12] = handle.0 as f32;
                pose[14] = 1.0;
                RawObservation {
                    observer: *handle,
                    category: spec.category,
                    target_name: spec.target_name.clone(),
                    pose,
                    status: TrackingStatus::Tracked,
                }
            })
            .collect()
    }
}

impl Default for MockTrackingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingEngine for MockTrackingEngine {
    #[instrument(name = "mock_engine_configure", skip(self, config))]
    fn configure(&mut self, config: &EngineConfig) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::Configure);

        let accepted = match &self.config.accepted_license {
            Some(expected) => *expected == config.license_key,
            None => !config.license_key.is_empty(),
        };
        if !accepted {
            return Err(EngineError::InvalidLicense {
                message: "license key rejected by mock engine".into(),
            });
        }
        state.configured = true;
        Ok(())
    }

    #[instrument(name = "mock_engine_start", skip(self, camera))]
    fn start(&mut self, camera: &mut dyn ExternalCamera) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        if !state.configured {
            return Err(EngineError::Configuration {
                message: "engine not configured".into(),
            });
        }
        if self.config.fail_start {
            return Err(EngineError::CameraUnavailable {
                message: "mock start failure".into(),
            });
        }
        if !camera.open() {
            return Err(EngineError::CameraUnavailable {
                message: "external camera failed to open".into(),
            });
        }
        let mode = camera
            .supported_modes()
            .into_iter()
            .find(|m| m.pixel_format.is_ingestible())
            .ok_or_else(|| EngineError::CameraUnavailable {
                message: "no ingestible camera mode".into(),
            })?;
        if !camera.start(mode) {
            return Err(EngineError::CameraUnavailable {
                message: "external camera failed to start".into(),
            });
        }

        state.calls.push(EngineCall::Start { mode });
        state.started = true;
        Ok(())
    }

    fn stop(&mut self, camera: &mut dyn ExternalCamera) {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::Stop);
        if state.started {
            camera.stop();
            state.started = false;
        }
    }

    fn teardown(&mut self, camera: &mut dyn ExternalCamera) {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::Teardown);
        if state.started {
            camera.stop();
            state.started = false;
        }
        camera.close();
        state.configured = false;
        state.observers.clear();
        state.outstanding.clear();
        state.intrinsics = None;
    }

    fn set_intrinsics(&mut self, intrinsics: &IntrinsicsWire) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::SetIntrinsics(*intrinsics));
        state.intrinsics = Some(*intrinsics);
        Ok(())
    }

    fn ingest_pose(&mut self, locator: &EngineLocator) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        Self::ensure_started(&state)?;
        if state.fail_ingest {
            return Err(EngineError::ingestion("mock pose ingestion failure"));
        }
        state.calls.push(EngineCall::IngestPose {
            timestamp_ns: locator.timestamp_ns,
        });
        Ok(())
    }

    fn ingest_frame(&mut self, frame: &EngineFrame) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        Self::ensure_started(&state)?;
        if state.fail_ingest {
            return Err(EngineError::ingestion("mock frame ingestion failure"));
        }
        let expected = frame.width as usize * frame.height as usize * RGB_BYTES_PER_PIXEL;
        if frame.pixels.len() != expected {
            return Err(EngineError::ingestion(format!(
                "frame buffer has {} bytes, expected {expected}",
                frame.pixels.len()
            )));
        }
        if let Some(intrinsics) = frame.intrinsics {
            state.intrinsics = Some(intrinsics);
        }
        state.calls.push(EngineCall::IngestFrame {
            timestamp_ns: frame.timestamp_ns,
            width: frame.width,
            height: frame.height,
        });
        Ok(())
    }

    fn acquire_latest_state(&mut self) -> EngineResult<EngineSnapshot> {
        let mut state = lock(&self.control.state);
        if !state.configured {
            return Err(EngineError::SnapshotUnavailable);
        }

        let observations = match &state.scripted {
            Some(scripted) => scripted.clone(),
            None if self.config.auto_track => Self::auto_observations(&state),
            None => Vec::new(),
        };

        state.next_snapshot += 1;
        let id = SnapshotId(state.next_snapshot);
        state.outstanding.insert(id);
        state.calls.push(EngineCall::Acquire(id));
        Ok(EngineSnapshot { id, observations })
    }

    fn release_state(&mut self, id: SnapshotId) -> EngineResult<()> {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::Release(id));
        if state.outstanding.remove(&id) {
            Ok(())
        } else {
            Err(EngineError::UnknownSnapshot(id))
        }
    }

    fn load_database(&mut self, category: TargetCategory, path: &Path) -> EngineResult<usize> {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::LoadDatabase {
            category,
            path: path.to_path_buf(),
        });
        self.config
            .databases
            .get(path)
            .map(Vec::len)
            .ok_or_else(|| EngineError::DatabaseNotFound {
                path: path.to_path_buf(),
            })
    }

    #[instrument(
        name = "mock_engine_create_observer",
        skip(self, spec),
        fields(category = %spec.category, target = %spec.target_name)
    )]
    fn create_observer(&mut self, spec: &ObserverSpec) -> EngineResult<ObserverHandle> {
        let mut state = lock(&self.control.state);
        if !state.configured {
            return Err(EngineError::NotStarted);
        }
        let targets = self.config.databases.get(&spec.database_path).ok_or_else(|| {
            EngineError::DatabaseNotFound {
                path: spec.database_path.clone(),
            }
        })?;
        if !targets.iter().any(|t| spec.target_name == t.as_str()) {
            return Err(EngineError::TargetNotFound {
                category: spec.category,
                name: spec.target_name.to_string(),
                path: spec.database_path.clone(),
            });
        }

        state.next_observer += 1;
        let handle = ObserverHandle(state.next_observer);
        state.observers.insert(handle, spec.clone());
        state.calls.push(EngineCall::CreateObserver {
            handle,
            name: spec.target_name.clone(),
        });
        debug!(handle = handle.0, "mock observer created");
        Ok(handle)
    }

    fn destroy_observer(&mut self, handle: ObserverHandle) {
        let mut state = lock(&self.control.state);
        state.calls.push(EngineCall::DestroyObserver(handle));
        state.observers.remove(&handle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DriverController;
    use contracts::{NoopLifecycleObserver, PixelFormat};

    fn driver() -> DriverController {
        DriverController::new(
            CameraMode {
                width: 4,
                height: 2,
                fps: 30.0,
                pixel_format: PixelFormat::Rgb888,
            },
            Arc::new(NoopLifecycleObserver),
        )
    }

    fn started_engine() -> (MockTrackingEngine, DriverController) {
        let mut engine = MockTrackingEngine::with_config(
            MockEngineConfig::default().with_database("db.xml", ["poster", "mug"]),
        );
        let mut camera = driver();
        engine
            .configure(&EngineConfig {
                license_key: "key".into(),
            })
            .unwrap();
        engine.start(&mut camera).unwrap();
        (engine, camera)
    }

    #[test]
    fn test_empty_license_rejected() {
        let mut engine = MockTrackingEngine::new();
        let err = engine.configure(&EngineConfig::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidLicense { .. }));
    }

    #[test]
    fn test_start_negotiates_mode() {
        let (engine, camera) = started_engine();
        assert!(camera.is_accepting());
        assert!(engine.control().is_started());
        assert!(engine
            .control()
            .calls()
            .iter()
            .any(|c| matches!(c, EngineCall::Start { mode } if mode.width == 4)));
    }

    #[test]
    fn test_ingest_requires_start() {
        let mut engine = MockTrackingEngine::new();
        let err = engine
            .ingest_pose(&EngineLocator {
                position: [0.0; 3],
                rotation: [0.0, 0.0, 0.0, 1.0],
                timestamp_ns: 1,
            })
            .unwrap_err();
        assert_eq!(err, EngineError::NotStarted);
    }

    #[test]
    fn test_snapshot_release_tracking() {
        let (mut engine, _camera) = started_engine();
        let control = engine.control();
        let snapshot = engine.acquire_latest_state().unwrap();
        assert_eq!(control.outstanding_snapshots(), 1);
        engine.release_state(snapshot.id).unwrap();
        assert_eq!(control.outstanding_snapshots(), 0);
        assert_eq!(
            engine.release_state(snapshot.id),
            Err(EngineError::UnknownSnapshot(snapshot.id))
        );
    }

    #[test]
    fn test_observer_lifecycle_and_auto_tracking() {
        let (mut engine, _camera) = started_engine();
        let spec = ObserverSpec {
            category: TargetCategory::Planar,
            database_path: "db.xml".into(),
            target_name: TargetName::from("poster"),
            guide_view_name: None,
        };
        let handle = engine.create_observer(&spec).unwrap();

        let snapshot = engine.acquire_latest_state().unwrap();
        assert_eq!(snapshot.observations.len(), 1);
        assert_eq!(snapshot.observations[0].observer, handle);
        assert_eq!(snapshot.observations[0].status, TrackingStatus::Tracked);
        engine.release_state(snapshot.id).unwrap();

        engine.destroy_observer(handle);
        let snapshot = engine.acquire_latest_state().unwrap();
        assert!(snapshot.observations.is_empty());
    }

    #[test]
    fn test_unknown_target_rejected() {
        let (mut engine, _camera) = started_engine();
        let spec = ObserverSpec {
            category: TargetCategory::Model,
            database_path: "db.xml".into(),
            target_name: TargetName::from("engine_block"),
            guide_view_name: Some("front".into()),
        };
        assert!(matches!(
            engine.create_observer(&spec),
            Err(EngineError::TargetNotFound { .. })
        ));
    }

    #[test]
    fn test_scripted_observations_override() {
        let (mut engine, _camera) = started_engine();
        let control = engine.control();
        control.script_observations(vec![scripted_observation(
            ObserverHandle(99),
            TargetCategory::Model,
            "ghost",
            TrackingStatus::ExtendedTracked,
        )]);
        let snapshot = engine.acquire_latest_state().unwrap();
        assert_eq!(snapshot.observations[0].target_name, "ghost");
    }
}
