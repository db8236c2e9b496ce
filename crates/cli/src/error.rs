//! Error types for CLI operations.

use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Engine session could not be started
    #[error("Failed to start engine session: {message}")]
    SessionStart { message: String },

    /// Databases or observers from the configuration could not be set up
    #[error("Failed to set up targets: {message}")]
    TargetSetup { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn session_start(message: impl Into<String>) -> Self {
        Self::SessionStart {
            message: message.into(),
        }
    }

    pub fn target_setup(message: impl Into<String>) -> Self {
        Self::TargetSetup {
            message: message.into(),
        }
    }
}

impl From<bridge::InitError> for CliError {
    fn from(err: bridge::InitError) -> Self {
        Self::session_start(err.to_string())
    }
}

impl From<registry::RegistryError> for CliError {
    fn from(err: registry::RegistryError) -> Self {
        Self::target_setup(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::TargetCategory;

    #[test]
    fn test_registry_error_maps_to_target_setup() {
        let err: CliError = registry::RegistryError::DatabaseNotLoaded {
            category: TargetCategory::Model,
        }
        .into();
        assert!(matches!(err, CliError::TargetSetup { .. }));
        assert!(err.to_string().starts_with("Failed to set up targets"));
    }
}
