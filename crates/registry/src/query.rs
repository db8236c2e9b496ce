//! Caller-facing query API
//!
//! Observation poses leave the engine in engine convention; this is where
//! they are converted back to host convention.

use std::sync::Arc;

use contracts::{TargetCategory, TargetName, TrackingEngine, TrackingObservation, TransformConfig};
use coord_transform::CoordinateTransform;

use crate::{ObserverRegistry, Result};

/// Read-only view of a registry in host coordinates
pub struct TargetQuery<E: TrackingEngine> {
    registry: Arc<ObserverRegistry<E>>,
    transform: CoordinateTransform,
}

impl<E: TrackingEngine> TargetQuery<E> {
    pub fn new(registry: Arc<ObserverRegistry<E>>, transform: TransformConfig) -> Self {
        Self {
            registry,
            transform: CoordinateTransform::new(transform),
        }
    }

    pub fn registry(&self) -> &Arc<ObserverRegistry<E>> {
        &self.registry
    }

    /// Names of Active registrations, in creation order
    pub fn list_active_targets(&self, category: TargetCategory) -> Vec<TargetName> {
        self.registry
            .registrations(category)
            .into_iter()
            .map(|registration| registration.name)
            .collect()
    }

    /// Tracked observations with poses in host convention
    pub fn get_observations(
        &self,
        category: TargetCategory,
        max_results: usize,
    ) -> Result<Vec<TrackingObservation>> {
        let mut observations = self.registry.query_observations(category, max_results)?;
        for observation in &mut observations {
            observation.pose = self.transform.matrix_to_host(&observation.pose);
        }
        Ok(observations)
    }
}

impl<E: TrackingEngine> std::fmt::Debug for TargetQuery<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TargetQuery")
            .field("registry", &self.registry)
            .field("transform", &self.transform)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge::{MockEngineConfig, MockTrackingEngine, SessionFactory};
    use contracts::{AxisFlip, CameraMode, EngineConfig, PixelFormat};
    use std::path::Path;

    fn query(transform: TransformConfig) -> (SessionFactory, TargetQuery<MockTrackingEngine>) {
        let factory = SessionFactory::new();
        let engine = MockTrackingEngine::with_config(
            MockEngineConfig::default().with_database("planar.xml", ["Logo", "Poster"]),
        );
        let bridge = factory.create_bridge_silent(
            engine,
            CameraMode {
                width: 2,
                height: 2,
                fps: 30.0,
                pixel_format: PixelFormat::Rgb888,
            },
        );
        bridge
            .initialize(&EngineConfig {
                license_key: "key".into(),
            })
            .unwrap();
        let registry = Arc::new(ObserverRegistry::new(Arc::new(bridge)));
        registry
            .load_database(TargetCategory::Planar, Path::new("planar.xml"))
            .unwrap();
        (factory, TargetQuery::new(registry, transform))
    }

    #[test]
    fn test_list_active_targets() {
        let (_factory, query) = query(TransformConfig::default());
        let registry = query.registry();
        registry
            .create_observer(TargetCategory::Planar, "Poster", None)
            .unwrap();
        registry
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();
        assert_eq!(
            query.list_active_targets(TargetCategory::Planar),
            vec![TargetName::from("Poster"), TargetName::from("Logo")]
        );
        assert!(query.list_active_targets(TargetCategory::Model).is_empty());
    }

    #[test]
    fn test_observations_converted_to_host() {
        let (_factory, query) = query(TransformConfig {
            axis_flip: AxisFlip::RotateX180,
            ..TransformConfig::default()
        });
        let handle = query
            .registry()
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();

        // mock pose: translation (handle, 0, 1) in engine convention
        let observations = query.get_observations(TargetCategory::Planar, 10).unwrap();
        assert_eq!(observations.len(), 1);
        let pose = observations[0].pose;
        assert!((pose[12] - handle.0 as f32).abs() < 1e-5);
        assert!(pose[13].abs() < 1e-5);
        assert!((pose[14] + 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_identity_transform_passes_pose_through() {
        let (_factory, query) = query(TransformConfig {
            axis_flip: AxisFlip::Identity,
            ..TransformConfig::default()
        });
        query
            .registry()
            .create_observer(TargetCategory::Planar, "Logo", None)
            .unwrap();
        let observations = query.get_observations(TargetCategory::Planar, 10).unwrap();
        assert!((observations[0].pose[14] - 1.0).abs() < 1e-5);
    }
}
