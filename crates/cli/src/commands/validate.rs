//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::{BridgeBlueprint, OrderingPolicy, RowOrder, TargetCategory};
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    camera_mode: String,
    has_intrinsics: bool,
    database_count: usize,
    target_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => {
            let warnings = collect_warnings(&blueprint);
            let mode = &blueprint.camera.mode;

            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", blueprint.version),
                    camera_mode: format!("{}x{}@{}", mode.width, mode.height, mode.fps),
                    has_intrinsics: blueprint.camera.intrinsics.is_some(),
                    database_count: blueprint.databases.len(),
                    target_count: blueprint.targets.len(),
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &BridgeBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.camera.intrinsics.is_none() {
        warnings.push("No intrinsics configured - frames will run in degraded mode".to_string());
    }

    if blueprint.targets.is_empty() {
        warnings.push("No targets configured - queries will return nothing".to_string());
    }

    for category in TargetCategory::ALL {
        if blueprint.database_for(category).is_some()
            && blueprint.targets_in(category).next().is_none()
        {
            warnings.push(format!("{category} database is loaded but has no targets"));
        }
    }

    if blueprint.sequencer.ordering_policy == OrderingPolicy::Tolerate {
        warnings.push("ordering_policy = tolerate - ordering violations are only counted".to_string());
    }

    if blueprint.camera.row_order == RowOrder::BottomUp {
        warnings.push("row_order = bottom_up - every frame is flipped before ingestion".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Camera mode: {}", summary.camera_mode);
            println!("  Intrinsics: {}", summary.has_intrinsics);
            println!("  Databases: {}", summary.database_count);
            println!("  Targets: {}", summary.target_count);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
