//! Cross-boundary call bridge
//!
//! Sole owner of the engine value. Every engine call goes through one mutex;
//! the session state is mirrored in an atomic so feeds can fail fast without
//! touching the lock once the session has left Running.

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use contracts::{
    CameraIntrinsics, CameraMode, DriverState, EngineConfig, EngineFrame, EngineLocator,
    IntrinsicsWire, LifecycleObserver, ObserverHandle, ObserverSpec, SessionState, SnapshotId,
    TargetCategory, TrackingEngine,
};
use observability::metrics::{
    record_feed_rejected, record_frame_fed, record_pose_fed, record_snapshot_acquired,
    record_snapshots_outstanding,
};
use tracing::{debug, error, info, instrument, warn};

use crate::error::{InitError, Result, SessionError};
use crate::session::SessionSlot;
use crate::{lock, DriverController, StateGuard};

struct BridgeInner<E> {
    engine: E,
    driver: DriverController,
    /// Observers created through this bridge and not yet destroyed
    observers: BTreeSet<ObserverHandle>,
    /// Last intrinsics set; replayed to the engine on initialize
    intrinsics: Option<IntrinsicsWire>,
    /// Engine cached intrinsics carried by an ingested frame this session
    frame_intrinsics: bool,
}

/// Call bridge owning one engine session
///
/// All methods take `&self`; share the bridge with `Arc` to call
/// [`CallBridge::shutdown`] from another thread.
pub struct CallBridge<E: TrackingEngine> {
    id: u64,
    slot: Arc<SessionSlot>,
    state: AtomicU8,
    inner: Mutex<BridgeInner<E>>,
    outstanding: AtomicUsize,
    degraded_warned: AtomicBool,
    /// Bumped each time a session ends
    epoch: AtomicU64,
}

impl<E: TrackingEngine> fmt::Debug for CallBridge<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallBridge")
            .field("id", &self.id)
            .field("state", &self.session_state())
            .field("outstanding_snapshots", &self.outstanding_snapshots())
            .finish()
    }
}

impl<E: TrackingEngine> CallBridge<E> {
    pub(crate) fn new(
        id: u64,
        slot: Arc<SessionSlot>,
        engine: E,
        mode: CameraMode,
        observer: Arc<dyn LifecycleObserver>,
    ) -> Self {
        Self {
            id,
            slot,
            state: AtomicU8::new(SessionState::Uninitialized as u8),
            inner: Mutex::new(BridgeInner {
                engine,
                driver: DriverController::new(mode, observer),
                observers: BTreeSet::new(),
                intrinsics: None,
                frame_intrinsics: false,
            }),
            outstanding: AtomicUsize::new(0),
            degraded_warned: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
        }
    }

    pub fn bridge_id(&self) -> u64 {
        self.id
    }

    #[inline]
    pub fn session_state(&self) -> SessionState {
        SessionState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: SessionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Number of sessions this bridge has ended.
    ///
    /// Anything keyed to engine objects of a session is stale once this
    /// value changes.
    pub fn session_epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// True iff the session is Running
    #[inline]
    pub fn is_driver_initialized(&self) -> bool {
        self.session_state() == SessionState::Running
    }

    pub fn driver_state(&self) -> DriverState {
        lock(&self.inner).driver.state()
    }

    pub fn camera_mode(&self) -> CameraMode {
        *lock(&self.inner).driver.mode()
    }

    /// Configure and start the engine; the session becomes Running.
    ///
    /// Spawns no threads. Initializing a bridge that is already Running is a
    /// programmer error: it panics in debug builds. A [`Self::shutdown`]
    /// arriving while the engine starts cancels the session before it runs.
    ///
    /// # Errors
    /// - `SessionActive` if another bridge from the same factory is Running
    /// - `EngineRejected` if the engine refuses configuration or start
    /// - `Cancelled` if shutdown was requested during initialization
    #[instrument(name = "bridge_initialize", skip(self, config), fields(bridge_id = self.id))]
    pub fn initialize(&self, config: &EngineConfig) -> std::result::Result<(), InitError> {
        let running = self.is_driver_initialized();
        debug_assert!(!running, "bridge {} initialized while running", self.id);
        if running {
            return Err(InitError::AlreadyInitialized);
        }
        if let Err(holder) = self.slot.claim(self.id) {
            warn!(holder, "initialize rejected: another session is running");
            return Err(InitError::SessionActive);
        }

        self.set_state(SessionState::Initializing);
        let mut guard = lock(&self.inner);
        let inner = &mut *guard;

        let started = inner
            .engine
            .configure(config)
            .and_then(|_| inner.engine.start(&mut inner.driver));
        if let Err(e) = started {
            error!(error = %e, "engine rejected initialization");
            inner.engine.teardown(&mut inner.driver);
            self.set_state(SessionState::Uninitialized);
            self.slot.release(self.id);
            return Err(InitError::EngineRejected(e));
        }

        if let Some(wire) = inner.intrinsics {
            if let Err(e) = inner.engine.set_intrinsics(&wire) {
                warn!(error = %e, "cached intrinsics rejected by engine");
            }
        }

        if let Err(state) = self.state.compare_exchange(
            SessionState::Initializing as u8,
            SessionState::Running as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            info!(
                state = ?SessionState::from_u8(state),
                "shutdown requested during initialize; session cancelled"
            );
            self.end_session(inner);
            return Err(InitError::Cancelled);
        }
        info!(driver_state = ?inner.driver.state(), "engine session running");
        Ok(())
    }

    /// Replace the camera intrinsics. Last write wins.
    ///
    /// Returns false if the values are invalid, the session is shutting
    /// down, or the engine rejects them.
    #[instrument(name = "bridge_set_intrinsics", skip(self, intrinsics))]
    pub fn set_intrinsics(&self, intrinsics: &CameraIntrinsics) -> bool {
        if let Err(e) = intrinsics.validate() {
            warn!(error = %e, "intrinsics rejected");
            return false;
        }
        let wire = marshaling::marshal_intrinsics(intrinsics);

        let mut inner = lock(&self.inner);
        let state = self.session_state();
        if state == SessionState::ShuttingDown {
            return false;
        }
        inner.intrinsics = Some(wire);
        if state == SessionState::Running {
            if let Err(e) = inner.engine.set_intrinsics(&wire) {
                warn!(error = %e, "engine rejected intrinsics");
                return false;
            }
        }

        info!(
            width = intrinsics.width,
            height = intrinsics.height,
            fx = intrinsics.focal_length[0],
            fy = intrinsics.focal_length[1],
            cx = intrinsics.principal_point[0],
            cy = intrinsics.principal_point[1],
            "camera intrinsics set"
        );
        true
    }

    /// [`Self::set_intrinsics`] from the 14-float wire array
    pub fn set_intrinsics_raw(&self, values: &[f32]) -> bool {
        match marshaling::parse_intrinsics(values) {
            Ok(intrinsics) => self.set_intrinsics(&intrinsics),
            Err(e) => {
                warn!(error = %e, len = values.len(), "intrinsics rejected");
                false
            }
        }
    }

    /// Whether intrinsics have been set for the current session
    pub fn has_intrinsics(&self) -> bool {
        lock(&self.inner).intrinsics.is_some()
    }

    fn reject(&self, kind: &'static str, reason: &'static str) -> bool {
        debug!(kind, reason, "feed rejected");
        record_feed_rejected(kind, reason);
        match kind {
            "pose" => record_pose_fed(false),
            _ => record_frame_fed(false),
        }
        false
    }

    /// Lock the inner state for a feed, or name why the feed is refused
    fn feed_inner(&self) -> std::result::Result<MutexGuard<'_, BridgeInner<E>>, &'static str> {
        if !self.is_driver_initialized() {
            return Err("session_not_running");
        }
        let inner = lock(&self.inner);
        if !self.is_driver_initialized() {
            return Err("session_not_running");
        }
        if !inner.driver.is_accepting() {
            return Err("camera_not_started");
        }
        Ok(inner)
    }

    /// Forward a marshaled pose. Never panics; false if not ingested.
    #[instrument(
        level = "trace",
        name = "bridge_feed_pose",
        skip(self, locator),
        fields(timestamp_ns = locator.timestamp_ns)
    )]
    pub fn feed_pose(&self, locator: &EngineLocator) -> bool {
        let mut inner = match self.feed_inner() {
            Ok(inner) => inner,
            Err(reason) => return self.reject("pose", reason),
        };
        match inner.engine.ingest_pose(locator) {
            Ok(()) => {
                record_pose_fed(true);
                true
            }
            Err(e) => {
                warn!(error = %e, timestamp_ns = locator.timestamp_ns, "engine rejected pose");
                self.reject("pose", "engine_rejected")
            }
        }
    }

    /// Forward a marshaled frame. Never panics; false if not ingested.
    ///
    /// Without intrinsics (per-frame or set earlier) the engine falls back to
    /// its defaults; this is warned once per session.
    #[instrument(
        level = "trace",
        name = "bridge_feed_frame",
        skip(self, frame),
        fields(timestamp_ns = frame.timestamp_ns, width = frame.width, height = frame.height)
    )]
    pub fn feed_frame(&self, frame: &EngineFrame) -> bool {
        let mut inner = match self.feed_inner() {
            Ok(inner) => inner,
            Err(reason) => return self.reject("frame", reason),
        };

        if frame.intrinsics.is_none()
            && inner.intrinsics.is_none()
            && !inner.frame_intrinsics
            && !self.degraded_warned.swap(true, Ordering::Relaxed)
        {
            warn!("no camera intrinsics set; frames ingested with engine defaults");
        }

        match inner.engine.ingest_frame(frame) {
            Ok(()) => {
                if frame.intrinsics.is_some() {
                    inner.frame_intrinsics = true;
                }
                record_frame_fed(true);
                true
            }
            Err(e) => {
                warn!(error = %e, timestamp_ns = frame.timestamp_ns, "engine rejected frame");
                self.reject("frame", "engine_rejected")
            }
        }
    }

    /// Acquire the engine's latest state snapshot.
    ///
    /// The guard releases the snapshot when dropped or on
    /// [`StateGuard::release`]; never hold it across a frame.
    #[instrument(level = "debug", name = "bridge_acquire_state", skip(self))]
    pub fn acquire_latest_state(&self) -> Result<StateGuard<'_, E>> {
        let snapshot = {
            let mut inner = self.running_inner()?;
            inner.engine.acquire_latest_state()?
        };
        let outstanding = self.outstanding.fetch_add(1, Ordering::AcqRel) + 1;
        record_snapshot_acquired();
        record_snapshots_outstanding(outstanding);
        Ok(StateGuard::new(self, snapshot))
    }

    pub(crate) fn release_snapshot(&self, id: SnapshotId) {
        let result = lock(&self.inner).engine.release_state(id);
        let outstanding = self
            .outstanding
            .fetch_sub(1, Ordering::AcqRel)
            .saturating_sub(1);
        record_snapshots_outstanding(outstanding);
        if let Err(e) = result {
            debug!(snapshot = id.0, error = %e, "snapshot release after session end");
        }
    }

    /// Snapshots acquired and not yet released
    pub fn outstanding_snapshots(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    fn running_inner(&self) -> Result<MutexGuard<'_, BridgeInner<E>>> {
        let state = self.session_state();
        if state != SessionState::Running {
            return Err(SessionError::not_running(state));
        }
        let inner = lock(&self.inner);
        let state = self.session_state();
        if state != SessionState::Running {
            return Err(SessionError::not_running(state));
        }
        Ok(inner)
    }

    /// Stop and tear down the engine, then hand the slot back
    fn end_session(&self, inner: &mut BridgeInner<E>) {
        inner.engine.stop(&mut inner.driver);
        inner.engine.teardown(&mut inner.driver);
        inner.intrinsics = None;
        inner.frame_intrinsics = false;
        self.degraded_warned.store(false, Ordering::Relaxed);
        self.epoch.fetch_add(1, Ordering::AcqRel);

        self.set_state(SessionState::Uninitialized);
        self.slot.release(self.id);
    }

    /// Ask the engine to stop the camera; feeds are refused until resumed
    #[instrument(name = "bridge_suspend", skip(self))]
    pub fn suspend(&self) -> Result<()> {
        let mut guard = self.running_inner()?;
        let inner = &mut *guard;
        inner.engine.stop(&mut inner.driver);
        info!(driver_state = ?inner.driver.state(), "session suspended");
        Ok(())
    }

    /// Restart the camera after [`Self::suspend`]
    #[instrument(name = "bridge_resume", skip(self))]
    pub fn resume(&self) -> Result<()> {
        let mut guard = self.running_inner()?;
        let inner = &mut *guard;
        inner.engine.start(&mut inner.driver)?;
        info!(driver_state = ?inner.driver.state(), "session resumed");
        Ok(())
    }

    /// Load a target database into the engine; returns its target count
    #[instrument(
        name = "bridge_load_database",
        skip(self, category, path),
        fields(category = %category, path = %path.display())
    )]
    pub fn load_database(&self, category: TargetCategory, path: &Path) -> Result<usize> {
        let mut inner = self.running_inner()?;
        Ok(inner.engine.load_database(category, path)?)
    }

    /// Create an engine observer tracked by this bridge
    pub fn create_observer(&self, spec: &ObserverSpec) -> Result<ObserverHandle> {
        let mut inner = self.running_inner()?;
        let handle = inner.engine.create_observer(spec)?;
        inner.observers.insert(handle);
        Ok(handle)
    }

    /// Destroy an observer created by this bridge; false if unknown
    pub fn destroy_observer(&self, handle: ObserverHandle) -> bool {
        let mut inner = lock(&self.inner);
        if !inner.observers.remove(&handle) {
            return false;
        }
        inner.engine.destroy_observer(handle);
        true
    }

    pub fn live_observer_count(&self) -> usize {
        lock(&self.inner).observers.len()
    }

    /// Running → ShuttingDown → Uninitialized.
    ///
    /// Idempotent and callable from any thread. Live observers are destroyed
    /// before the engine is stopped; feeds fail fast afterwards. During
    /// Initializing the request is recorded and [`Self::initialize`] tears the
    /// session down instead of publishing Running.
    #[instrument(name = "bridge_shutdown", skip(self), fields(bridge_id = self.id))]
    pub fn shutdown(&self) {
        let mut current = self.session_state();
        loop {
            if !matches!(current, SessionState::Running | SessionState::Initializing) {
                debug!(state = ?current, "shutdown ignored: session not running");
                return;
            }
            match self.state.compare_exchange(
                current as u8,
                SessionState::ShuttingDown as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = SessionState::from_u8(actual),
            }
        }
        if current == SessionState::Initializing {
            info!("shutdown requested while initializing");
            return;
        }

        let mut guard = lock(&self.inner);
        let inner = &mut *guard;
        let observers = std::mem::take(&mut inner.observers);
        for handle in &observers {
            inner.engine.destroy_observer(*handle);
        }
        self.end_session(inner);
        info!(
            destroyed_observers = observers.len(),
            outstanding_snapshots = self.outstanding_snapshots(),
            "engine session shut down"
        );
    }
}

impl<E: TrackingEngine> Drop for CallBridge<E> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
