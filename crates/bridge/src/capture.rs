//! Capture loop and synthetic capture source
//!
//! The loop is the single producer: one pose and one frame per tick, fed
//! through the sequencer. A slow engine slows the loop down; nothing queues.

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use contracts::{
    CameraFrame, CameraIntrinsics, CameraMode, CaptureSample, CaptureSource, DevicePose,
    TrackingEngine,
};
use observability::metrics::{
    record_feed_latency_ms, FeedOutcome, FeedStatsAggregator, FeedSummary,
};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument};

use crate::{CallBridge, Sequencer};

const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(1);

/// Deterministic pose + gradient frame source
///
/// Sample `i` is taken at `start_ns + i * interval`, moves 1 cm along x and
/// yaws 0.01 rad per sample.
#[derive(Debug, Clone)]
pub struct SyntheticCapture {
    id: String,
    mode: CameraMode,
    start_ns: i64,
    index: u64,
    limit: Option<u64>,
    intrinsics: Option<CameraIntrinsics>,
}

impl SyntheticCapture {
    pub fn new(id: impl Into<String>, mode: CameraMode) -> Self {
        Self {
            id: id.into(),
            mode,
            start_ns: 0,
            index: 0,
            limit: None,
            intrinsics: None,
        }
    }

    /// Stop after `limit` samples
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_start_ns(mut self, start_ns: i64) -> Self {
        self.start_ns = start_ns;
        self
    }

    /// Attach these intrinsics to every frame
    pub fn with_intrinsics(mut self, intrinsics: CameraIntrinsics) -> Self {
        self.intrinsics = Some(intrinsics);
        self
    }

    pub fn samples_produced(&self) -> u64 {
        self.index
    }

    fn interval_ns(&self) -> i64 {
        self.frame_interval().as_nanos() as i64
    }

    fn pose_at(&self, index: u64, timestamp_ns: i64) -> DevicePose {
        let yaw = 0.01 * index as f32;
        let (s, c) = (yaw * 0.5).sin_cos();
        DevicePose {
            position: [0.01 * index as f32, 0.0, 0.0],
            rotation: [0.0, s, 0.0, c],
            timestamp_ns,
        }
    }

    fn frame_at(&self, index: u64, timestamp_ns: i64) -> CameraFrame {
        let (w, h) = (self.mode.width as usize, self.mode.height as usize);
        let mut pixels = Vec::with_capacity(w * h * 3);
        for y in 0..h {
            for x in 0..w {
                let v = ((x + y) as u64 + index) as u8;
                pixels.extend_from_slice(&[v, v.wrapping_add(85), v.wrapping_add(170)]);
            }
        }
        CameraFrame {
            pixels: Bytes::from(pixels),
            width: self.mode.width,
            height: self.mode.height,
            timestamp_ns,
            intrinsics: self.intrinsics,
        }
    }
}

impl CaptureSource for SyntheticCapture {
    fn source_id(&self) -> &str {
        &self.id
    }

    fn frame_interval(&self) -> Duration {
        if self.mode.fps > 0.0 {
            Duration::from_secs_f32(1.0 / self.mode.fps).max(MIN_FRAME_INTERVAL)
        } else {
            MIN_FRAME_INTERVAL
        }
    }

    fn poll(&mut self) -> Option<CaptureSample> {
        if self.limit.is_some_and(|limit| self.index >= limit) {
            return None;
        }
        let index = self.index;
        let timestamp_ns = self.start_ns + index as i64 * self.interval_ns();
        self.index += 1;
        Some(CaptureSample {
            pose: self.pose_at(index, timestamp_ns),
            frame: self.frame_at(index, timestamp_ns),
        })
    }
}

/// Per-frame capture loop feeding one bridge
pub struct CaptureLoop<E: TrackingEngine> {
    bridge: Arc<CallBridge<E>>,
    sequencer: Sequencer,
    source: Box<dyn CaptureSource>,
    stats: FeedStatsAggregator,
}

impl<E: TrackingEngine> CaptureLoop<E> {
    pub fn new(
        bridge: Arc<CallBridge<E>>,
        sequencer: Sequencer,
        source: Box<dyn CaptureSource>,
    ) -> Self {
        Self {
            bridge,
            sequencer,
            source,
            stats: FeedStatsAggregator::new(),
        }
    }

    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    pub fn stats(&self) -> &FeedStatsAggregator {
        &self.stats
    }

    /// Poll one sample and feed pose then frame; `None` once exhausted
    pub fn tick(&mut self) -> Option<FeedOutcome> {
        let sample = self.source.poll()?;
        let started = Instant::now();
        let pose_accepted = self.sequencer.feed_pose(&self.bridge, &sample.pose);
        let frame_accepted = self.sequencer.feed_frame(&self.bridge, &sample.frame);
        let latency_ms = started.elapsed().as_secs_f64() * 1000.0;
        record_feed_latency_ms(latency_ms);

        Some(FeedOutcome {
            pose_accepted,
            frame_accepted,
            latency_ms,
            observations: None,
        })
    }

    /// Tick at the source's frame interval until shutdown is signalled, the
    /// session stops running or the source is exhausted.
    ///
    /// `sample` runs after every tick and returns the number of observations
    /// the caller saw, if it queried.
    #[instrument(name = "capture_loop", skip_all, fields(source = %self.source.source_id()))]
    pub async fn run<F>(
        &mut self,
        mut shutdown: watch::Receiver<bool>,
        mut sample: F,
    ) -> FeedSummary
    where
        F: FnMut() -> Option<usize>,
    {
        let mut interval = tokio::time::interval(self.source.frame_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(
            interval_ms = self.source.frame_interval().as_millis() as u64,
            "capture loop started"
        );

        loop {
            if *shutdown.borrow() {
                info!("capture loop stopping: shutdown requested");
                break;
            }
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("shutdown sender dropped");
                    }
                    info!("capture loop stopping: shutdown requested");
                    break;
                }
                _ = interval.tick() => {
                    if !self.bridge.is_driver_initialized() {
                        info!("capture loop stopping: session not running");
                        break;
                    }
                    let Some(mut outcome) = self.tick() else {
                        info!("capture loop stopping: source exhausted");
                        break;
                    };
                    outcome.observations = sample();
                    self.stats.update(&outcome);
                }
            }
        }

        let summary = self.stats.summary();
        info!(
            ticks = summary.total_ticks,
            frames_rejected = summary.frames_rejected,
            ordering_violations = self.sequencer.stats().ordering_violations(),
            "capture loop finished"
        );
        summary
    }
}

impl<E: TrackingEngine> std::fmt::Debug for CaptureLoop<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureLoop")
            .field("source", &self.source.source_id())
            .field("sequencer", &self.sequencer)
            .field("ticks", &self.stats.total_ticks)
            .finish()
    }
}
