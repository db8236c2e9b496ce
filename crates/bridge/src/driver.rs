//! Driver lifecycle controller
//!
//! Answers the engine's external-camera callbacks and tracks whether the
//! camera is in a state where feeds may be accepted.

use std::fmt;
use std::sync::Arc;

use contracts::{CameraMode, DriverState, ExternalCamera, LifecycleObserver};
use tracing::{debug, info, warn};

/// External camera driver advertising exactly one mode
pub struct DriverController {
    mode: CameraMode,
    state: DriverState,
    observer: Arc<dyn LifecycleObserver>,
}

impl fmt::Debug for DriverController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverController")
            .field("mode", &self.mode)
            .field("state", &self.state)
            .finish()
    }
}

impl DriverController {
    pub fn new(mode: CameraMode, observer: Arc<dyn LifecycleObserver>) -> Self {
        Self {
            mode,
            state: DriverState::Closed,
            observer,
        }
    }

    pub fn state(&self) -> DriverState {
        self.state
    }

    pub fn mode(&self) -> &CameraMode {
        &self.mode
    }

    /// Feeds are accepted only while Started
    #[inline]
    pub fn is_accepting(&self) -> bool {
        self.state == DriverState::Started
    }

    fn fail(&self, reason: &str) -> bool {
        warn!(state = ?self.state, reason, "external camera transition failed");
        self.observer.on_failed(reason);
        false
    }
}

impl ExternalCamera for DriverController {
    fn open(&mut self) -> bool {
        match self.state {
            DriverState::Closed => {
                self.state = DriverState::Open;
                debug!("external camera opened");
                true
            }
            DriverState::Open | DriverState::Stopped => true,
            DriverState::Started => self.fail("open while started"),
        }
    }

    fn supported_modes(&self) -> Vec<CameraMode> {
        vec![self.mode]
    }

    fn start(&mut self, mode: CameraMode) -> bool {
        match self.state {
            DriverState::Open | DriverState::Stopped => {}
            DriverState::Started => return true,
            DriverState::Closed => return self.fail("start before open"),
        }
        if mode != self.mode {
            return self.fail("unsupported camera mode");
        }
        if !mode.pixel_format.is_ingestible() {
            return self.fail("pixel format not ingestible");
        }

        self.state = DriverState::Started;
        info!(
            width = mode.width,
            height = mode.height,
            fps = mode.fps,
            "external camera started"
        );
        self.observer.on_ready(&mode);
        true
    }

    fn stop(&mut self) -> bool {
        match self.state {
            DriverState::Started => {
                self.state = DriverState::Stopped;
                info!("external camera stopped");
                self.observer.on_stopped();
                true
            }
            DriverState::Open | DriverState::Stopped => true,
            DriverState::Closed => false,
        }
    }

    fn close(&mut self) -> bool {
        if self.state == DriverState::Started {
            self.stop();
        }
        if self.state != DriverState::Closed {
            debug!("external camera closed");
        }
        self.state = DriverState::Closed;
        true
    }
}
