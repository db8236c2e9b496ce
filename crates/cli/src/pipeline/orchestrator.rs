//! Pipeline orchestrator - wires config, engine, bridge, registry and the
//! capture loop together.
//!
//! Runs against the mock engine with a synthetic capture source; the mock's
//! databases are derived from the configured targets.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use bridge::{
    CaptureLoop, MockEngineConfig, MockEngineControl, MockTrackingEngine, Sequencer,
    SequencerConfig, SessionFactory, SyntheticCapture,
};
use contracts::{BridgeBlueprint, CameraMode, LifecycleObserver, TargetCategory};
use registry::{ObserverRegistry, TargetQuery};
use tokio::sync::watch;
use tracing::{error, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: BridgeBlueprint,

    /// Maximum number of frames to feed (None = unlimited)
    pub max_frames: Option<u64>,

    /// Run timeout (None = no timeout)
    pub timeout: Option<Duration>,

    /// Query observations every N frames (None = never)
    pub query_every: Option<u64>,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Logs driver lifecycle events
#[derive(Debug, Default)]
struct TracingLifecycleObserver;

impl LifecycleObserver for TracingLifecycleObserver {
    fn on_ready(&self, mode: &CameraMode) {
        info!(
            width = mode.width,
            height = mode.height,
            fps = mode.fps,
            "camera ready"
        );
    }

    fn on_failed(&self, reason: &str) {
        error!(reason, "camera failed to start");
    }

    fn on_stopped(&self) {
        info!("camera stopped");
    }
}

/// Main pipeline orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run until the source is exhausted, the timeout fires or `shutdown`
    /// flips to true. The session is torn down before returning.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let engine = MockTrackingEngine::with_config(mock_config_for(blueprint));
        let control = engine.control();
        info!("Running against the MOCK tracking engine");

        let factory = SessionFactory::new();
        let bridge = Arc::new(factory.create_bridge(
            engine,
            blueprint.camera.mode,
            Arc::new(TracingLifecycleObserver),
        ));

        bridge
            .initialize(&blueprint.to_engine_config())
            .map_err(CliError::from)?;
        info!(bridge_id = bridge.bridge_id(), "Engine session running");

        let intrinsics = blueprint
            .resolved_intrinsics()
            .context("Invalid intrinsics in configuration")?;
        match intrinsics {
            Some(intrinsics) => {
                if !bridge.set_intrinsics(&intrinsics) {
                    warn!("Engine did not accept the configured intrinsics");
                }
            }
            None => warn!("No intrinsics configured; frames run in degraded mode"),
        }

        let registry = Arc::new(ObserverRegistry::new(Arc::clone(&bridge)));
        let setup = registry.apply_blueprint(blueprint).map_err(CliError::from);
        let active_targets = match setup {
            Ok(created) => created,
            Err(e) => {
                registry.shutdown();
                return Err(e.into());
            }
        };
        info!(
            databases = blueprint.databases.len(),
            observers = active_targets,
            "Targets registered"
        );

        let query = TargetQuery::new(Arc::clone(&registry), blueprint.transform);
        let mut source = SyntheticCapture::new("synthetic", blueprint.camera.mode);
        if let Some(max) = self.config.max_frames {
            source = source.with_limit(max);
        }
        let mut capture = CaptureLoop::new(
            Arc::clone(&bridge),
            Sequencer::new(SequencerConfig::from_blueprint(blueprint)),
            Box::new(source),
        );

        let mut sampler = QuerySampler {
            query: &query,
            control: &control,
            every: self.config.query_every,
            max_results: blueprint.query.max_results,
            tick: 0,
            total: 0,
        };

        info!(max_frames = ?self.config.max_frames, "Capture loop running");
        let run = capture.run(shutdown, || sampler.poll());
        let (feed, timed_out) = match self.config.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, run).await {
                Ok(summary) => (summary, false),
                Err(_) => {
                    warn!(timeout_secs = timeout.as_secs(), "Run timed out");
                    (capture.stats().summary(), true)
                }
            },
            None => (run.await, false),
        };
        let observations_total = sampler.total;

        info!("Shutting down engine session...");
        let destroyed = registry.shutdown();
        info!(observers_destroyed = destroyed, "Engine session shut down");

        let stats = PipelineStats {
            feed,
            sequencer: capture.sequencer().stats(),
            active_targets,
            observations_total,
            timed_out,
            duration: start_time.elapsed(),
        };
        info!(
            duration_secs = stats.duration.as_secs_f64(),
            fps = format!("{:.2}", stats.fps()),
            "Run complete"
        );
        Ok(stats)
    }
}

/// Per-tick observation query driven from the capture loop
struct QuerySampler<'a> {
    query: &'a TargetQuery<MockTrackingEngine>,
    control: &'a MockEngineControl,
    every: Option<u64>,
    max_results: usize,
    tick: u64,
    total: u64,
}

impl QuerySampler<'_> {
    fn poll(&mut self) -> Option<usize> {
        self.tick += 1;
        // The mock call log is unbounded.
        self.control.clear_calls();

        let every = self.every?;
        if self.tick % every != 0 {
            return None;
        }

        let mut seen = 0;
        for category in TargetCategory::ALL {
            match self.query.get_observations(category, self.max_results) {
                Ok(observations) => seen += observations.len(),
                Err(e) => {
                    warn!(category = %category, error = %e, "Observation query failed");
                    return None;
                }
            }
        }
        self.total += seen as u64;
        Some(seen)
    }
}

/// Mock engine databases holding exactly the configured targets
fn mock_config_for(blueprint: &BridgeBlueprint) -> MockEngineConfig {
    blueprint
        .databases
        .iter()
        .fold(MockEngineConfig::default(), |config, database| {
            let names: Vec<String> = blueprint
                .targets_in(database.category)
                .map(|target| target.name.clone())
                .collect();
            config.with_database(database.path.clone(), names)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[engine]
license_key = "dev"

[camera.mode]
width = 8
height = 6
fps = 120.0

[camera.intrinsics]
width = 8
height = 6
focal_length = [10.0, 10.0]
principal_point = [4.0, 3.0]

[[databases]]
category = "planar"
path = "targets/planar.xml"

[[targets]]
category = "planar"
name = "Logo"
"#;

    fn config(max_frames: u64) -> PipelineConfig {
        PipelineConfig {
            blueprint: ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap(),
            max_frames: Some(max_frames),
            timeout: None,
            query_every: Some(1),
            metrics_port: None,
        }
    }

    #[test]
    fn test_mock_config_for_blueprint() {
        let blueprint = config(1).blueprint;
        let mock = mock_config_for(&blueprint);
        let targets = mock
            .databases
            .get(std::path::Path::new("targets/planar.xml"))
            .unwrap();
        assert_eq!(targets, &vec!["Logo".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_to_frame_limit() {
        let (_tx, rx) = watch::channel(false);
        let stats = Pipeline::new(config(4)).run(rx).await.unwrap();

        assert_eq!(stats.feed.total_ticks, 4);
        assert_eq!(stats.feed.frames_rejected, 0);
        assert_eq!(stats.active_targets, 1);
        assert_eq!(stats.observations_total, 4);
        assert_eq!(stats.sequencer.ordering_violations(), 0);
        assert!(!stats.timed_out);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown_signal() {
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();
        let mut cfg = config(1_000);
        cfg.max_frames = None;

        let stats = Pipeline::new(cfg).run(rx).await.unwrap();
        assert_eq!(stats.feed.total_ticks, 0);
    }

    #[tokio::test]
    async fn test_target_without_database_fails_setup() {
        let mut cfg = config(1);
        cfg.blueprint.targets[0].category = TargetCategory::Model;

        let (_tx, rx) = watch::channel(false);
        let err = Pipeline::new(cfg).run(rx).await.unwrap_err();
        assert!(err.to_string().contains("Failed to set up targets"));
    }
}
