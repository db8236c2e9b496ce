//! Run statistics.

use std::time::Duration;

use bridge::SequencerStats;
use observability::FeedSummary;

/// Statistics from one bridge run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Per-tick feed outcomes
    pub feed: FeedSummary,

    /// Sequencer counters, including ordering violations
    pub sequencer: SequencerStats,

    /// Observers registered from the configuration
    pub active_targets: usize,

    /// Tracked observations summed over every query
    pub observations_total: u64,

    /// Run stopped by the timeout rather than by the source or a signal
    pub timed_out: bool,

    pub duration: Duration,
}

impl PipelineStats {
    /// Frames fed per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.feed.total_ticks as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Bridge Run Statistics ===\n");

        println!("Overview");
        println!("   Duration: {:.2}s", self.duration.as_secs_f64());
        println!("   Frames fed: {}", self.feed.total_ticks);
        println!("   FPS: {:.2}", self.fps());
        println!("   Active targets: {}", self.active_targets);
        println!("   Observations returned: {}", self.observations_total);
        if self.timed_out {
            println!("   Stopped by timeout");
        }

        println!("\nSequencer");
        println!("   Poses forwarded: {}", self.sequencer.poses_forwarded);
        println!("   Frames forwarded: {}", self.sequencer.frames_forwarded);
        println!(
            "   Ordering violations: {} (missing pose {}, pose regressions {})",
            self.sequencer.ordering_violations(),
            self.sequencer.missing_pose,
            self.sequencer.pose_regressions
        );
        println!("   Marshal rejections: {}", self.sequencer.marshal_rejections);

        println!("\n{}", self.feed);
    }
}
