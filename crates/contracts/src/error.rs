//! Layered error definitions
//!
//! Categorized by source: config / data model / engine

use std::path::PathBuf;

use thiserror::Error;

use crate::{ObserverHandle, SnapshotId, TargetCategory};

/// Unified error type for the shared data model and configuration
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Data Model Errors =====
    /// Camera intrinsics violate their invariants
    #[error("invalid intrinsics field '{field}': {message}")]
    InvalidIntrinsics { field: String, message: String },

    /// Target name cannot be carried through the engine
    #[error("invalid target name {name:?}: {message}")]
    InvalidTargetName { name: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_intrinsics(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidIntrinsics {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_target_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidTargetName {
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Errors reported by a tracking engine implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// License key rejected
    #[error("license rejected: {message}")]
    InvalidLicense { message: String },

    /// Engine refused its configuration
    #[error("engine configuration rejected: {message}")]
    Configuration { message: String },

    /// Engine has not been started
    #[error("engine is not started")]
    NotStarted,

    /// External camera callbacks failed during start
    #[error("external camera unavailable: {message}")]
    CameraUnavailable { message: String },

    /// Database file unknown to the engine
    #[error("database not found: {}", path.display())]
    DatabaseNotFound { path: PathBuf },

    /// Target missing from the database
    #[error("{category} target '{name}' not found in {}", path.display())]
    TargetNotFound {
        category: TargetCategory,
        name: String,
        path: PathBuf,
    },

    /// Observer handle unknown to the engine
    #[error("observer {0:?} not found")]
    ObserverNotFound(ObserverHandle),

    /// No state has been published yet
    #[error("no state snapshot available")]
    SnapshotUnavailable,

    /// Release of a snapshot the engine never handed out
    #[error("snapshot {0:?} is not outstanding")]
    UnknownSnapshot(SnapshotId),

    /// Ingestion entry point rejected its input
    #[error("ingestion rejected: {message}")]
    Ingestion { message: String },
}

impl EngineError {
    pub fn ingestion(message: impl Into<String>) -> Self {
        Self::Ingestion {
            message: message.into(),
        }
    }
}

/// Engine result alias
pub type EngineResult<T> = std::result::Result<T, EngineError>;
