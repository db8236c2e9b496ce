//! Frame/pose synchronization sequencer
//!
//! Forwards pose(T) and frame(T) to the bridge in call order. Nothing is
//! buffered or reordered: the ring below only remembers which pose
//! timestamps were accepted so that a frame without its pose is detected.

use contracts::{
    BridgeBlueprint, CameraFrame, CameraIntrinsics, DevicePose, OrderingPolicy, RowOrder,
    TrackingEngine, TransformConfig,
};
use coord_transform::CoordinateTransform;
use marshaling::{
    locator_from_pose, marshal_pose, parse_intrinsics, FrameMarshaler, MarshalError,
};
use observability::metrics::{
    record_feed_rejected, record_frame_fed, record_ordering_violation, record_pose_fed,
};
use ringbuf::{traits::*, HeapRb};
use tracing::{instrument, trace, warn};

use crate::CallBridge;

const DEFAULT_POSE_HISTORY: usize = 8;

/// Sequencer configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SequencerConfig {
    pub ordering_policy: OrderingPolicy,
    /// Recent accepted pose timestamps kept for ordering checks
    pub pose_history: usize,
    /// Scanline order of host frames
    pub row_order: RowOrder,
    pub transform: TransformConfig,
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            ordering_policy: OrderingPolicy::default(),
            pose_history: DEFAULT_POSE_HISTORY,
            row_order: RowOrder::default(),
            transform: TransformConfig::default(),
        }
    }
}

impl SequencerConfig {
    pub fn from_blueprint(blueprint: &BridgeBlueprint) -> Self {
        Self {
            ordering_policy: blueprint.sequencer.ordering_policy,
            pose_history: blueprint.sequencer.pose_history,
            row_order: blueprint.camera.row_order,
            transform: blueprint.transform,
        }
    }
}

/// Counters kept by one sequencer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SequencerStats {
    pub poses_forwarded: u64,
    pub frames_forwarded: u64,
    /// Frames whose timestamp matched no recently accepted pose
    pub missing_pose: u64,
    /// Poses older than the previous accepted pose
    pub pose_regressions: u64,
    /// Feeds rejected before reaching the bridge
    pub marshal_rejections: u64,
}

impl SequencerStats {
    pub fn ordering_violations(&self) -> u64 {
        self.missing_pose + self.pose_regressions
    }
}

/// Single-producer feed sequencer
pub struct Sequencer {
    policy: OrderingPolicy,
    transform: CoordinateTransform,
    marshaler: FrameMarshaler,
    recent_poses: HeapRb<i64>,
    last_pose_ts: Option<i64>,
    stats: SequencerStats,
}

impl std::fmt::Debug for Sequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sequencer")
            .field("policy", &self.policy)
            .field("recent_poses", &self.recent_poses.occupied_len())
            .field("last_pose_ts", &self.last_pose_ts)
            .field("stats", &self.stats)
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
enum Violation {
    MissingPose,
    PoseRegressed,
}

impl Violation {
    fn label(self) -> &'static str {
        match self {
            Violation::MissingPose => "missing_pose",
            Violation::PoseRegressed => "pose_regressed",
        }
    }
}

impl Sequencer {
    pub fn new(config: SequencerConfig) -> Self {
        Self {
            policy: config.ordering_policy,
            transform: CoordinateTransform::new(config.transform),
            marshaler: FrameMarshaler::new(config.row_order),
            recent_poses: HeapRb::new(config.pose_history.max(1)),
            last_pose_ts: None,
            stats: SequencerStats::default(),
        }
    }

    pub fn stats(&self) -> SequencerStats {
        self.stats
    }

    pub fn marshaler(&self) -> &FrameMarshaler {
        &self.marshaler
    }

    pub fn transform(&self) -> &CoordinateTransform {
        &self.transform
    }

    /// Forget accepted poses, e.g. after the session restarted
    pub fn reset(&mut self) {
        self.recent_poses.clear();
        self.last_pose_ts = None;
    }

    /// Convert a host pose to engine convention and feed it.
    ///
    /// The timestamp counts as accepted only if the bridge ingested the pose.
    #[instrument(
        level = "trace",
        name = "sequencer_feed_pose",
        skip(self, bridge, pose),
        fields(timestamp_ns = pose.timestamp_ns)
    )]
    pub fn feed_pose<E: TrackingEngine>(
        &mut self,
        bridge: &CallBridge<E>,
        pose: &DevicePose,
    ) -> bool {
        if let Some(last) = self.last_pose_ts {
            if pose.timestamp_ns < last {
                self.violation(Violation::PoseRegressed, pose.timestamp_ns);
            }
        }

        let engine_pose = self.transform.device_pose_to_engine(pose);
        if !bridge.feed_pose(&locator_from_pose(&engine_pose)) {
            return false;
        }

        self.recent_poses.push_overwrite(pose.timestamp_ns);
        self.last_pose_ts = Some(pose.timestamp_ns);
        self.stats.poses_forwarded += 1;
        true
    }

    /// [`Self::feed_pose`] from raw host arrays
    pub fn feed_pose_raw<E: TrackingEngine>(
        &mut self,
        bridge: &CallBridge<E>,
        position: &[f32],
        rotation: &[f32],
        timestamp_ns: i64,
    ) -> bool {
        match marshal_pose(position, rotation, timestamp_ns) {
            Ok(locator) => self.feed_pose(
                bridge,
                &DevicePose {
                    position: locator.position,
                    rotation: locator.rotation,
                    timestamp_ns,
                },
            ),
            Err(e) => self.reject("pose", &e),
        }
    }

    /// Marshal a frame and feed it after checking its pose was accepted
    #[instrument(
        level = "trace",
        name = "sequencer_feed_frame",
        skip(self, bridge, frame),
        fields(timestamp_ns = frame.timestamp_ns)
    )]
    pub fn feed_frame<E: TrackingEngine>(
        &mut self,
        bridge: &CallBridge<E>,
        frame: &CameraFrame,
    ) -> bool {
        self.forward_frame(
            bridge,
            &frame.pixels,
            frame.width,
            frame.height,
            frame.intrinsics.as_ref(),
            frame.timestamp_ns,
        )
    }

    /// [`Self::feed_frame`] from a raw pixel buffer and optional 14-float
    /// intrinsics array
    pub fn feed_frame_raw<E: TrackingEngine>(
        &mut self,
        bridge: &CallBridge<E>,
        pixels: &[u8],
        width: u32,
        height: u32,
        intrinsics: Option<&[f32]>,
        timestamp_ns: i64,
    ) -> bool {
        let intrinsics = match intrinsics.map(parse_intrinsics).transpose() {
            Ok(intrinsics) => intrinsics,
            Err(e) => return self.reject("frame", &e),
        };
        self.forward_frame(bridge, pixels, width, height, intrinsics.as_ref(), timestamp_ns)
    }

    fn forward_frame<E: TrackingEngine>(
        &mut self,
        bridge: &CallBridge<E>,
        pixels: &[u8],
        width: u32,
        height: u32,
        intrinsics: Option<&CameraIntrinsics>,
        timestamp_ns: i64,
    ) -> bool {
        let frame = match self
            .marshaler
            .marshal_frame(pixels, width, height, intrinsics, timestamp_ns)
        {
            Ok(frame) => frame,
            Err(e) => return self.reject("frame", &e),
        };

        if !self.recent_poses.iter().any(|&ts| ts == timestamp_ns) {
            self.violation(Violation::MissingPose, timestamp_ns);
        }

        if !bridge.feed_frame(&frame) {
            return false;
        }
        self.stats.frames_forwarded += 1;
        trace!(timestamp_ns, "frame forwarded");
        true
    }

    fn reject(&mut self, kind: &'static str, error: &MarshalError) -> bool {
        warn!(kind, reason = error.reason(), error = %error, "feed rejected by marshaling");
        self.stats.marshal_rejections += 1;
        record_feed_rejected(kind, error.reason());
        match kind {
            "pose" => record_pose_fed(false),
            _ => record_frame_fed(false),
        }
        false
    }

    fn violation(&mut self, violation: Violation, timestamp_ns: i64) {
        match violation {
            Violation::MissingPose => self.stats.missing_pose += 1,
            Violation::PoseRegressed => self.stats.pose_regressions += 1,
        }
        match self.policy {
            OrderingPolicy::Tolerate => {}
            OrderingPolicy::Flag => {
                warn!(
                    kind = violation.label(),
                    timestamp_ns,
                    last_pose_ts = ?self.last_pose_ts,
                    "frame/pose ordering violation"
                );
                record_ordering_violation(violation.label());
            }
            OrderingPolicy::Assert => panic!(
                "frame/pose ordering violation ({}) at timestamp {timestamp_ns}",
                violation.label()
            ),
        }
    }
}
