//! Registry error types

use bridge::SessionError;
use contracts::{EngineError, SessionState, TargetCategory};
use thiserror::Error;

/// Target observer registry error
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegistryError {
    /// No database loaded for the category
    #[error("no {category} database loaded")]
    DatabaseNotLoaded { category: TargetCategory },

    /// Name already Active in the category
    #[error("{category} target '{name}' is already registered")]
    DuplicateName {
        category: TargetCategory,
        name: String,
    },

    /// Name cannot be carried through the engine
    #[error("invalid target name {name:?}: {message}")]
    InvalidName { name: String, message: String },

    /// Engine refused the request
    #[error("engine rejected request: {0}")]
    EngineRejected(EngineError),

    /// Bridge session is not Running
    #[error("engine session is not running (state: {state:?})")]
    SessionNotRunning { state: SessionState },
}

impl RegistryError {
    pub fn duplicate(category: TargetCategory, name: impl Into<String>) -> Self {
        Self::DuplicateName {
            category,
            name: name.into(),
        }
    }

    pub fn invalid_name(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidName {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<SessionError> for RegistryError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotRunning { state } => Self::SessionNotRunning { state },
            SessionError::Engine(e) => Self::EngineRejected(e),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, RegistryError>;
