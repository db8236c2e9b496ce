//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Config file → session → registry → capture loop against the mock engine
//! - Acceptance scenarios for intrinsics, registration, queries and
//!   coordinate conventions
//! - Concurrent feed/query and cross-task shutdown

#[cfg(test)]
mod contract_tests {
    use contracts::{CameraIntrinsics, IntrinsicsWire, TargetName, INTRINSICS_WIRE_LEN};

    #[test]
    fn test_intrinsics_wire_layout() {
        assert_eq!(
            std::mem::size_of::<IntrinsicsWire>(),
            INTRINSICS_WIRE_LEN * std::mem::size_of::<f32>()
        );
        let k = CameraIntrinsics::new(2, 2, [1.0, 1.0], [1.0, 1.0], &[]).unwrap();
        assert_eq!(marshaling::marshal_intrinsics(&k).width, 2.0);
    }

    #[test]
    fn test_target_name_limit() {
        assert!(TargetName::try_new(&"a".repeat(TargetName::MAX_LEN)).is_ok());
        assert!(TargetName::try_new(&"a".repeat(TargetName::MAX_LEN + 1)).is_err());
    }
}

#[cfg(test)]
mod support {
    use std::sync::Arc;

    use bridge::{
        CallBridge, MockEngineConfig, MockEngineControl, MockTrackingEngine, SessionFactory,
    };
    use contracts::{CameraMode, EngineConfig, PixelFormat};
    use registry::ObserverRegistry;

    pub const PLANAR_DB: &str = "targets/planar.xml";
    pub const MODEL_DB: &str = "targets/model.dat";

    pub fn mode(width: u32, height: u32) -> CameraMode {
        CameraMode {
            width,
            height,
            fps: 60.0,
            pixel_format: PixelFormat::Rgb888,
        }
    }

    pub fn engine_config() -> EngineConfig {
        EngineConfig {
            license_key: "test-license".into(),
        }
    }

    /// One factory, one running bridge and a registry over it
    pub struct Harness {
        pub factory: SessionFactory,
        pub control: MockEngineControl,
        pub bridge: Arc<CallBridge<MockTrackingEngine>>,
        pub registry: Arc<ObserverRegistry<MockTrackingEngine>>,
    }

    impl Harness {
        pub fn running() -> Self {
            let harness = Self::uninitialized();
            harness.bridge.initialize(&engine_config()).unwrap();
            harness
        }

        pub fn uninitialized() -> Self {
            let factory = SessionFactory::new();
            let engine = MockTrackingEngine::with_config(
                MockEngineConfig::default()
                    .with_database(PLANAR_DB, ["Logo", "Poster", "Mug"])
                    .with_database(MODEL_DB, ["Engine"]),
            );
            let control = engine.control();
            let bridge = Arc::new(factory.create_bridge_silent(engine, mode(4, 3)));
            let registry = Arc::new(ObserverRegistry::new(Arc::clone(&bridge)));
            Self {
                factory,
                control,
                bridge,
                registry,
            }
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use bridge::mock_engine::scripted_observation;
    use contracts::{AxisFlip, DriverState, IntrinsicsWire, TargetCategory, TrackingStatus};
    use coord_transform::{flip_axes, RigidPose};
    use rand::{rngs::StdRng, Rng, SeedableRng};
    use registry::RegistryError;
    use std::path::Path;

    use crate::support::{Harness, PLANAR_DB};

    const SCENARIO_INTRINSICS: [f32; 14] = [
        1280.0, 960.0, 1024.0, 960.0, 640.0, 480.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0,
    ];

    fn planar_harness(names: &[&str]) -> Harness {
        let harness = Harness::running();
        harness
            .registry
            .load_database(TargetCategory::Planar, Path::new(PLANAR_DB))
            .unwrap();
        for name in names {
            harness
                .registry
                .create_observer(TargetCategory::Planar, name, None)
                .unwrap();
        }
        harness
    }

    #[test]
    fn scenario_a_intrinsics_and_driver_initialization() {
        let harness = Harness::uninitialized();

        assert!(!harness.bridge.is_driver_initialized());
        assert!(harness.bridge.set_intrinsics_raw(&SCENARIO_INTRINSICS));
        assert!(harness.bridge.has_intrinsics());

        harness.bridge.initialize(&crate::support::engine_config()).unwrap();
        assert!(harness.bridge.is_driver_initialized());
        assert_eq!(harness.bridge.driver_state(), DriverState::Started);
        assert_eq!(
            harness.control.cached_intrinsics(),
            Some(IntrinsicsWire::from_array(SCENARIO_INTRINSICS))
        );
    }

    #[test]
    fn scenario_b_duplicate_registration() {
        let harness = planar_harness(&["Logo"]);

        let err = harness
            .registry
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateName { .. }));

        let registrations = harness.registry.registrations(TargetCategory::Planar);
        assert_eq!(registrations.len(), 1);
        assert_eq!(registrations[0].name, "Logo");
        assert_eq!(harness.bridge.live_observer_count(), 1);
    }

    #[test]
    fn scenario_c_query_filters_not_tracked() {
        let harness = planar_harness(&["Logo", "Poster", "Mug"]);
        let handle = |name: &str| {
            harness
                .control
                .observer_for(TargetCategory::Planar, name)
                .unwrap()
        };
        let planar = |name: &str, status: TrackingStatus| {
            scripted_observation(handle(name), TargetCategory::Planar, name, status)
        };
        harness.control.script_observations(vec![
            planar("Logo", TrackingStatus::Tracked),
            planar("Poster", TrackingStatus::NotTracked),
            planar("Mug", TrackingStatus::ExtendedTracked),
        ]);

        let observations = harness
            .registry
            .query_observations(TargetCategory::Planar, 10)
            .unwrap();
        let names: Vec<_> = observations.iter().map(|o| o.target_name.as_str()).collect();
        assert_eq!(names, ["Logo", "Mug"]);
        assert_eq!(harness.bridge.outstanding_snapshots(), 0);
        assert_eq!(harness.control.outstanding_snapshots(), 0);
    }

    #[test]
    fn scenario_d_destroyed_name_is_suppressed() {
        let harness = planar_harness(&["Logo", "Poster"]);
        let logo = harness
            .control
            .observer_for(TargetCategory::Planar, "Logo")
            .unwrap();
        let poster = harness
            .control
            .observer_for(TargetCategory::Planar, "Poster")
            .unwrap();

        assert!(harness.registry.destroy_observer(TargetCategory::Planar, "Logo"));

        // Engine still reports the destroyed observer for one more poll.
        harness.control.script_observations(vec![
            scripted_observation(logo, TargetCategory::Planar, "Logo", TrackingStatus::Tracked),
            scripted_observation(poster, TargetCategory::Planar, "Poster", TrackingStatus::Tracked),
        ]);

        for _ in 0..2 {
            let observations = harness
                .registry
                .query_observations(TargetCategory::Planar, 10)
                .unwrap();
            assert!(observations.iter().all(|o| o.target_name != "Logo"));
            assert_eq!(observations.len(), 1);
        }
    }

    #[test]
    fn scenario_e_axis_flip_is_involutive() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..256 {
            let pose = RigidPose::new(
                std::array::from_fn(|_| rng.random_range(-10.0..10.0)),
                std::array::from_fn(|_| rng.random_range(-1.0..1.0)),
            );
            let twice = flip_axes(&flip_axes(&pose, AxisFlip::RotateX180), AxisFlip::RotateX180);
            assert_eq!(twice, pose);
        }
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::io::Write;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use bridge::{
        CaptureLoop, InitError, MockEngineConfig, MockTrackingEngine, Sequencer, SequencerConfig,
        SessionFactory, SyntheticCapture,
    };
    use bytes::Bytes;
    use config_loader::ConfigLoader;
    use contracts::{CameraFrame, DevicePose, OrderingPolicy, SessionState, TargetCategory};
    use registry::{ObserverRegistry, TargetQuery};
    use tokio::sync::watch;

    use crate::support::{engine_config, mode, Harness, MODEL_DB, PLANAR_DB};

    const BRIDGE_TOML: &str = r#"
[engine]
license_key = "e2e"

[camera]
row_order = "bottom_up"
intrinsics = [6, 4, 5.0, 5.0, 3.0, 2.0, 0, 0, 0, 0, 0, 0, 0, 0]

[camera.mode]
width = 6
height = 4
fps = 50.0

[sequencer]
ordering_policy = "assert"

[[databases]]
category = "planar"
path = "targets/planar.xml"

[[databases]]
category = "model"
path = "targets/model.dat"

[[targets]]
category = "planar"
name = "Logo"

[[targets]]
category = "model"
name = "Engine"
guide_view = "front"
"#;

    /// Config file → session → registry → capture loop → host-convention query
    #[tokio::test(start_paused = true)]
    async fn test_e2e_config_to_query() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(BRIDGE_TOML.as_bytes()).unwrap();
        let blueprint = ConfigLoader::load_from_path(file.path()).unwrap();

        let factory = SessionFactory::new();
        let engine = MockTrackingEngine::with_config(
            MockEngineConfig::default()
                .with_database(PLANAR_DB, ["Logo"])
                .with_database(MODEL_DB, ["Engine"]),
        );
        let control = engine.control();
        let bridge = Arc::new(factory.create_bridge_silent(engine, blueprint.camera.mode));
        bridge.initialize(&blueprint.to_engine_config()).unwrap();
        let intrinsics = blueprint.resolved_intrinsics().unwrap().unwrap();
        assert!(bridge.set_intrinsics(&intrinsics));

        let registry = Arc::new(ObserverRegistry::new(Arc::clone(&bridge)));
        assert_eq!(registry.apply_blueprint(&blueprint).unwrap(), 2);

        let query = TargetQuery::new(Arc::clone(&registry), blueprint.transform);
        let mut capture = CaptureLoop::new(
            Arc::clone(&bridge),
            Sequencer::new(SequencerConfig::from_blueprint(&blueprint)),
            Box::new(SyntheticCapture::new("e2e", blueprint.camera.mode).with_limit(10)),
        );

        let (_tx, rx) = watch::channel(false);
        let summary = capture
            .run(rx, || {
                let planar = query.get_observations(TargetCategory::Planar, 10).ok()?;
                let model = query.get_observations(TargetCategory::Model, 10).ok()?;
                Some(planar.len() + model.len())
            })
            .await;

        assert_eq!(summary.total_ticks, 10);
        assert_eq!(summary.frames_rejected, 0);
        assert_eq!(summary.observations.count, 10);
        assert_eq!(summary.observations.mean, 2.0);

        let ingestion = control.ingestion_calls();
        assert_eq!(ingestion.len(), 20);
        assert_eq!(capture.sequencer().stats().ordering_violations(), 0);
        assert_eq!(
            query.list_active_targets(TargetCategory::Model),
            vec![contracts::TargetName::from("Engine")]
        );

        assert_eq!(registry.destroy_all(), 2);
        bridge.shutdown();
        assert_eq!(bridge.session_state(), SessionState::Uninitialized);
        assert_eq!(control.outstanding_snapshots(), 0);
    }

    #[test]
    fn test_one_running_session_per_factory() {
        let factory = SessionFactory::new();
        let first = factory.create_bridge_silent(MockTrackingEngine::new(), mode(2, 2));
        let second = factory.create_bridge_silent(MockTrackingEngine::new(), mode(2, 2));

        first.initialize(&engine_config()).unwrap();
        assert!(matches!(
            second.initialize(&engine_config()),
            Err(InitError::SessionActive)
        ));

        first.shutdown();
        assert!(!factory.has_running_session());
        second.initialize(&engine_config()).unwrap();
        assert!(factory.has_running_session());
    }

    #[test]
    fn test_targets_do_not_outlive_their_session() {
        let harness = Harness::running();
        let query = TargetQuery::new(
            Arc::clone(&harness.registry),
            contracts::TransformConfig::default(),
        );
        harness
            .registry
            .load_database(TargetCategory::Planar, std::path::Path::new(PLANAR_DB))
            .unwrap();
        harness
            .registry
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();

        harness.bridge.shutdown();
        assert!(query.list_active_targets(TargetCategory::Planar).is_empty());
        assert_eq!(harness.registry.len(), 0);

        harness.bridge.initialize(&engine_config()).unwrap();
        harness
            .registry
            .load_database(TargetCategory::Planar, std::path::Path::new(PLANAR_DB))
            .unwrap();
        harness
            .registry
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();
        assert_eq!(
            query.list_active_targets(TargetCategory::Planar),
            vec![contracts::TargetName::from("Logo")]
        );
        assert_eq!(harness.control.live_observers().len(), 1);
    }

    #[test]
    fn test_feeds_rejected_after_shutdown() {
        let harness = Harness::running();
        let mut sequencer = Sequencer::new(SequencerConfig::default());
        let pose = DevicePose::identity(1_000);
        let frame = CameraFrame {
            pixels: Bytes::from(vec![0u8; 4 * 3 * 3]),
            width: 4,
            height: 3,
            timestamp_ns: 1_000,
            intrinsics: None,
        };

        assert!(sequencer.feed_pose(&harness.bridge, &pose));
        assert!(sequencer.feed_frame(&harness.bridge, &frame));

        harness.bridge.shutdown();
        assert!(!sequencer.feed_pose(&harness.bridge, &DevicePose::identity(2_000)));
        assert!(!sequencer.feed_frame(&harness.bridge, &frame));
        assert!(harness.bridge.acquire_latest_state().is_err());
    }

    #[test]
    fn test_frame_without_pose_is_flagged() {
        let harness = Harness::running();
        let mut sequencer = Sequencer::new(SequencerConfig {
            ordering_policy: OrderingPolicy::Flag,
            ..SequencerConfig::default()
        });
        let frame = CameraFrame {
            pixels: Bytes::from(vec![7u8; 4 * 3 * 3]),
            width: 4,
            height: 3,
            timestamp_ns: 5_000,
            intrinsics: None,
        };

        sequencer.feed_frame(&harness.bridge, &frame);
        assert_eq!(sequencer.stats().missing_pose, 1);
    }

    #[test]
    fn test_concurrent_feed_and_query() {
        let harness = Harness::running();
        harness
            .registry
            .load_database(TargetCategory::Planar, std::path::Path::new(PLANAR_DB))
            .unwrap();
        harness
            .registry
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();
        let done = AtomicBool::new(false);

        std::thread::scope(|s| {
            s.spawn(|| {
                let mut source = SyntheticCapture::new("feeder", mode(4, 3)).with_limit(200);
                let mut sequencer = Sequencer::new(SequencerConfig {
                    ordering_policy: OrderingPolicy::Assert,
                    ..SequencerConfig::default()
                });
                while let Some(sample) = contracts::CaptureSource::poll(&mut source) {
                    assert!(sequencer.feed_pose(&harness.bridge, &sample.pose));
                    assert!(sequencer.feed_frame(&harness.bridge, &sample.frame));
                }
                done.store(true, Ordering::Release);
            });

            for _ in 0..2 {
                s.spawn(|| {
                    while !done.load(Ordering::Acquire) {
                        let observations = harness
                            .registry
                            .query_observations(TargetCategory::Planar, 10)
                            .unwrap();
                        assert!(observations.len() <= 1);
                    }
                });
            }
        });

        assert_eq!(harness.bridge.outstanding_snapshots(), 0);
        assert_eq!(harness.control.outstanding_snapshots(), 0);
        assert_eq!(harness.control.ingestion_calls().len(), 400);
    }

    #[tokio::test]
    async fn test_shutdown_from_another_task() {
        let harness = Harness::running();
        let mut capture = CaptureLoop::new(
            Arc::clone(&harness.bridge),
            Sequencer::new(SequencerConfig::default()),
            Box::new(SyntheticCapture::new("live", mode(4, 3))),
        );
        let (tx, rx) = watch::channel(false);

        let bridge = Arc::clone(&harness.bridge);
        let stopper = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            tx.send(true).unwrap();
            bridge.shutdown();
        });

        let summary = capture.run(rx, || None).await;
        stopper.await.unwrap();

        assert!(summary.total_ticks > 0);
        assert_eq!(harness.bridge.session_state(), SessionState::Uninitialized);
        assert!(!harness.factory.has_running_session());
    }

    #[test]
    fn test_model_guide_view_reaches_engine() {
        let harness = Harness::running();
        harness
            .registry
            .load_database(TargetCategory::Model, std::path::Path::new(MODEL_DB))
            .unwrap();
        harness
            .registry
            .create_observer(TargetCategory::Model, "Engine", Some("front"))
            .unwrap();

        let registration = &harness.registry.registrations(TargetCategory::Model)[0];
        assert_eq!(registration.guide_view_name.as_deref(), Some("front"));
        assert!(harness
            .control
            .observer_for(TargetCategory::Model, "Engine")
            .is_some());
    }
}
