//! BridgeBlueprint - Config Loader output
//!
//! Describes a complete bridge setup: engine credentials, camera mode and
//! intrinsics, pose conventions, sequencing policy, target databases and the
//! targets to observe.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::{
    CameraIntrinsics, CameraMode, ContractError, EngineConfig, OrderingPolicy, RowOrder,
    TargetCategory, TransformConfig,
};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete bridge configuration blueprint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    pub engine: EngineSection,

    pub camera: CameraSection,

    #[serde(default)]
    pub transform: TransformConfig,

    #[serde(default)]
    pub sequencer: SequencerSection,

    /// One database per category
    #[serde(default)]
    pub databases: Vec<DatabaseConfig>,

    #[serde(default)]
    pub targets: Vec<TargetConfig>,

    #[serde(default)]
    pub query: QuerySection,
}

/// Engine credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineSection {
    pub license_key: String,
}

/// Camera mode advertised to the engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraSection {
    pub mode: CameraMode,

    /// Scanline order of the host buffers
    #[serde(default)]
    pub row_order: RowOrder,

    /// Intrinsics set at startup; frames run in degraded mode without them
    #[serde(default)]
    pub intrinsics: Option<IntrinsicsConfig>,
}

/// Intrinsics as written in a config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntrinsicsConfig {
    /// `[width, height, fx, fy, cx, cy, d0..d7]`
    Wire(Vec<f32>),
    Structured(CameraIntrinsics),
}

/// Sequencer tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequencerSection {
    #[serde(default)]
    pub ordering_policy: OrderingPolicy,

    /// Number of recent pose timestamps remembered for ordering checks
    #[serde(default = "default_pose_history")]
    pub pose_history: usize,
}

impl Default for SequencerSection {
    fn default() -> Self {
        Self {
            ordering_policy: OrderingPolicy::default(),
            pose_history: default_pose_history(),
        }
    }
}

fn default_pose_history() -> usize {
    8
}

/// Target database reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub category: TargetCategory,
    pub path: PathBuf,
}

/// Target to observe at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub category: TargetCategory,
    pub name: String,

    /// Model targets only
    #[serde(default)]
    pub guide_view: Option<String>,
}

/// Query defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuerySection {
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            max_results: default_max_results(),
        }
    }
}

fn default_max_results() -> usize {
    10
}

impl BridgeBlueprint {
    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            license_key: self.engine.license_key.clone(),
        }
    }

    /// Startup intrinsics, parsed from whichever form the file used
    pub fn resolved_intrinsics(&self) -> Result<Option<CameraIntrinsics>, ContractError> {
        match &self.camera.intrinsics {
            None => Ok(None),
            Some(IntrinsicsConfig::Structured(intrinsics)) => {
                intrinsics.validate()?;
                Ok(Some(*intrinsics))
            }
            Some(IntrinsicsConfig::Wire(values)) => {
                CameraIntrinsics::from_wire_slice(values).map(Some)
            }
        }
    }

    pub fn database_for(&self, category: TargetCategory) -> Option<&DatabaseConfig> {
        self.databases.iter().find(|db| db.category == category)
    }

    pub fn targets_in(&self, category: TargetCategory) -> impl Iterator<Item = &TargetConfig> {
        self.targets.iter().filter(move |t| t.category == category)
    }
}
