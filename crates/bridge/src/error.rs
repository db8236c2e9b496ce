//! Bridge error types

use contracts::{EngineError, SessionState};
use thiserror::Error;

/// Session initialization failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InitError {
    /// Another bridge from the same factory is Running
    #[error("another engine session is already running")]
    SessionActive,

    /// This bridge is already Running
    #[error("engine session already initialized")]
    AlreadyInitialized,

    /// Engine refused configuration or start
    #[error("engine rejected initialization: {0}")]
    EngineRejected(EngineError),

    /// Shutdown was requested before the session started running
    #[error("engine session initialization cancelled by shutdown")]
    Cancelled,
}

/// Failure of a call that needs a Running session
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// Session is not Running
    #[error("engine session is not running (state: {state:?})")]
    NotRunning { state: SessionState },

    /// Engine returned an error
    #[error(transparent)]
    Engine(#[from] EngineError),
}

impl SessionError {
    pub fn not_running(state: SessionState) -> Self {
        Self::NotRunning { state }
    }
}

/// Result alias for session calls
pub type Result<T> = std::result::Result<T, SessionError>;
