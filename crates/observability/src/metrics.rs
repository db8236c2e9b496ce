//! Bridge metric recorders
//!
//! Thin wrappers over the `metrics` macros so metric names live in one place,
//! plus an in-memory aggregator for end-of-run summaries.

use std::collections::HashMap;

use contracts::TargetCategory;
use metrics::{counter, gauge, histogram};

/// Record one pose handed to the bridge
pub fn record_pose_fed(accepted: bool) {
    let status = if accepted { "accepted" } else { "rejected" };
    counter!("quforia_bridge_poses_fed_total", "status" => status).increment(1);
}

/// Record one frame handed to the bridge
pub fn record_frame_fed(accepted: bool) {
    let status = if accepted { "accepted" } else { "rejected" };
    counter!("quforia_bridge_frames_fed_total", "status" => status).increment(1);
}

/// Record why a feed never reached the engine
///
/// `kind` is `"pose"` or `"frame"`; `reason` is a short static label.
pub fn record_feed_rejected(kind: &'static str, reason: &'static str) {
    counter!(
        "quforia_bridge_feed_rejections_total",
        "kind" => kind,
        "reason" => reason
    )
    .increment(1);
}

/// Record a frame/pose ordering violation
pub fn record_ordering_violation(kind: &'static str) {
    counter!("quforia_bridge_ordering_violations_total", "kind" => kind).increment(1);
}

/// Record a state snapshot acquisition
pub fn record_snapshot_acquired() {
    counter!("quforia_bridge_snapshots_acquired_total").increment(1);
}

/// Snapshots acquired and not yet released
pub fn record_snapshots_outstanding(count: usize) {
    gauge!("quforia_bridge_snapshots_outstanding").set(count as f64);
}

/// Observations returned by one query
pub fn record_observations(category: TargetCategory, count: usize) {
    counter!(
        "quforia_bridge_observations_total",
        "category" => category.as_str()
    )
    .increment(count as u64);
    histogram!(
        "quforia_bridge_observations_per_query",
        "category" => category.as_str()
    )
    .record(count as f64);
}

/// Active registrations in the registry
pub fn record_active_registrations(category: TargetCategory, count: usize) {
    gauge!(
        "quforia_bridge_active_registrations",
        "category" => category.as_str()
    )
    .set(count as f64);
}

/// Wall time of one pose+frame feed
pub fn record_feed_latency_ms(latency_ms: f64) {
    histogram!("quforia_bridge_feed_latency_ms").record(latency_ms);
}

/// Result of one capture tick, as seen by the aggregator
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedOutcome {
    pub pose_accepted: bool,
    pub frame_accepted: bool,
    pub latency_ms: f64,
    /// Tracked observations returned after the tick, if a query ran
    pub observations: Option<usize>,
}

/// Feed statistics aggregator
///
/// Aggregates in memory for the CLI run summary.
#[derive(Debug, Clone, Default)]
pub struct FeedStatsAggregator {
    pub total_ticks: u64,
    pub poses_rejected: u64,
    pub frames_rejected: u64,
    pub latency_stats: RunningStats,
    pub observation_stats: RunningStats,
    /// Tick counts keyed by observation count
    pub observation_histogram: HashMap<usize, u64>,
}

impl FeedStatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, outcome: &FeedOutcome) {
        self.total_ticks += 1;
        if !outcome.pose_accepted {
            self.poses_rejected += 1;
        }
        if !outcome.frame_accepted {
            self.frames_rejected += 1;
        }
        self.latency_stats.push(outcome.latency_ms);

        if let Some(count) = outcome.observations {
            self.observation_stats.push(count as f64);
            *self.observation_histogram.entry(count).or_insert(0) += 1;
        }
    }

    pub fn summary(&self) -> FeedSummary {
        let rate = |n: u64| {
            if self.total_ticks > 0 {
                n as f64 / self.total_ticks as f64 * 100.0
            } else {
                0.0
            }
        };
        FeedSummary {
            total_ticks: self.total_ticks,
            poses_rejected: self.poses_rejected,
            frames_rejected: self.frames_rejected,
            frame_rejection_rate: rate(self.frames_rejected),
            latency_ms: StatsSummary::from(&self.latency_stats),
            observations: StatsSummary::from(&self.observation_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Feed summary
#[derive(Debug, Clone, Default)]
pub struct FeedSummary {
    pub total_ticks: u64,
    pub poses_rejected: u64,
    pub frames_rejected: u64,
    pub frame_rejection_rate: f64,
    pub latency_ms: StatsSummary,
    pub observations: StatsSummary,
}

impl std::fmt::Display for FeedSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Feed Summary ===")?;
        writeln!(f, "Ticks: {}", self.total_ticks)?;
        writeln!(f, "Poses rejected: {}", self.poses_rejected)?;
        writeln!(
            f,
            "Frames rejected: {} ({:.2}%)",
            self.frames_rejected, self.frame_rejection_rate
        )?;
        writeln!(f, "Feed latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Tracked observations: {}", self.observations)?;
        Ok(())
    }
}

/// Summary statistics
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// Online statistics (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts_rejections() {
        let mut aggregator = FeedStatsAggregator::new();
        aggregator.update(&FeedOutcome {
            pose_accepted: true,
            frame_accepted: true,
            latency_ms: 1.0,
            observations: Some(2),
        });
        aggregator.update(&FeedOutcome {
            pose_accepted: true,
            frame_accepted: false,
            latency_ms: 3.0,
            observations: None,
        });

        let summary = aggregator.summary();
        assert_eq!(summary.total_ticks, 2);
        assert_eq!(summary.frames_rejected, 1);
        assert_eq!(summary.poses_rejected, 0);
        assert!((summary.frame_rejection_rate - 50.0).abs() < 1e-10);
        assert!((summary.latency_ms.mean - 2.0).abs() < 1e-10);
        assert_eq!(summary.observations.count, 1);
        assert_eq!(aggregator.observation_histogram.get(&2), Some(&1));
    }

    #[test]
    fn test_summary_display_and_reset() {
        let mut aggregator = FeedStatsAggregator::new();
        assert!(aggregator.summary().to_string().contains("N/A"));

        aggregator.update(&FeedOutcome::default());
        assert!(aggregator.summary().to_string().contains("Ticks: 1"));

        aggregator.reset();
        assert_eq!(aggregator.total_ticks, 0);
    }

    #[test]
    fn test_recorders_without_installed_recorder() {
        // No global recorder: every call must be a no-op.
        record_pose_fed(true);
        record_frame_fed(false);
        record_feed_rejected("frame", "size_mismatch");
        record_ordering_violation("missing_pose");
        record_snapshot_acquired();
        record_snapshots_outstanding(0);
        record_observations(TargetCategory::Planar, 3);
        record_active_registrations(TargetCategory::Model, 1);
        record_feed_latency_ms(0.5);
    }
}
