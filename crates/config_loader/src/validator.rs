//! Configuration validation
//!
//! Rules:
//! - license key is non-empty
//! - camera mode has a positive resolution and frame rate and an ingestible
//!   pixel format
//! - intrinsics, when given, are valid and match the camera resolution
//! - at most one database per category
//! - target names are valid and unique within their category, and every
//!   target's category has a database
//! - guide views only on model targets
//! - `query.max_results` and `sequencer.pose_history` are > 0
//! - optical offset is finite

use std::collections::HashSet;

use contracts::{BridgeBlueprint, ContractError, TargetCategory, TargetName};

/// Validate a parsed blueprint.
///
/// Returns the first error encountered.
pub fn validate(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    validate_engine(blueprint)?;
    validate_camera_mode(blueprint)?;
    validate_intrinsics(blueprint)?;
    validate_databases(blueprint)?;
    validate_targets(blueprint)?;
    validate_tuning(blueprint)?;
    Ok(())
}

fn validate_engine(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    if blueprint.engine.license_key.trim().is_empty() {
        return Err(ContractError::config_validation(
            "engine.license_key",
            "license key cannot be empty",
        ));
    }
    Ok(())
}

fn validate_camera_mode(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let mode = &blueprint.camera.mode;
    if mode.width == 0 || mode.height == 0 {
        return Err(ContractError::config_validation(
            "camera.mode",
            format!("resolution must be > 0, got {}x{}", mode.width, mode.height),
        ));
    }
    if !(mode.fps > 0.0 && mode.fps.is_finite()) {
        return Err(ContractError::config_validation(
            "camera.mode.fps",
            format!("fps must be > 0, got {}", mode.fps),
        ));
    }
    if !mode.pixel_format.is_ingestible() {
        return Err(ContractError::config_validation(
            "camera.mode.pixel_format",
            format!("{:?} frames cannot be ingested", mode.pixel_format),
        ));
    }
    if mode.frame_len().is_none() {
        return Err(ContractError::config_validation(
            "camera.mode",
            "frame size overflows",
        ));
    }
    Ok(())
}

fn validate_intrinsics(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let intrinsics = blueprint
        .resolved_intrinsics()
        .map_err(|e| ContractError::config_validation("camera.intrinsics", e.to_string()))?;

    if let Some(k) = intrinsics {
        let mode = &blueprint.camera.mode;
        if (k.width, k.height) != (mode.width, mode.height) {
            return Err(ContractError::config_validation(
                "camera.intrinsics",
                format!(
                    "intrinsics resolution {}x{} does not match camera mode {}x{}",
                    k.width, k.height, mode.width, mode.height
                ),
            ));
        }
    }
    Ok(())
}

fn validate_databases(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, db) in blueprint.databases.iter().enumerate() {
        if db.path.as_os_str().is_empty() {
            return Err(ContractError::config_validation(
                format!("databases[{idx}].path"),
                "database path cannot be empty",
            ));
        }
        if !seen.insert(db.category) {
            return Err(ContractError::config_validation(
                format!("databases[{idx}].category"),
                format!("duplicate database for category '{}'", db.category),
            ));
        }
    }
    Ok(())
}

fn validate_targets(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, target) in blueprint.targets.iter().enumerate() {
        TargetName::try_new(&target.name).map_err(|e| {
            ContractError::config_validation(format!("targets[{idx}].name"), e.to_string())
        })?;

        if !seen.insert((target.category, target.name.as_str())) {
            return Err(ContractError::config_validation(
                format!("targets[{idx}].name"),
                format!(
                    "duplicate {} target name '{}'",
                    target.category, target.name
                ),
            ));
        }

        if blueprint.database_for(target.category).is_none() {
            return Err(ContractError::config_validation(
                format!("targets[{idx}].category"),
                format!("no database configured for category '{}'", target.category),
            ));
        }

        if target.guide_view.is_some() && target.category != TargetCategory::Model {
            return Err(ContractError::config_validation(
                format!("targets[{idx}].guide_view"),
                "guide views apply to model targets only",
            ));
        }
    }
    Ok(())
}

fn validate_tuning(blueprint: &BridgeBlueprint) -> Result<(), ContractError> {
    if blueprint.query.max_results == 0 {
        return Err(ContractError::config_validation(
            "query.max_results",
            "max_results must be > 0",
        ));
    }
    if blueprint.sequencer.pose_history == 0 {
        return Err(ContractError::config_validation(
            "sequencer.pose_history",
            "pose_history must be > 0",
        ));
    }
    if blueprint
        .transform
        .optical_offset
        .offset
        .iter()
        .any(|c| !c.is_finite())
    {
        return Err(ContractError::config_validation(
            "transform.optical_offset.offset",
            "offset must be finite",
        ));
    }
    Ok(())
}
