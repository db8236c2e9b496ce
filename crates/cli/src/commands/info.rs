//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::BridgeBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    camera: CameraInfo,
    transform: TransformInfo,
    sequencer: SequencerInfo,
    databases: Vec<DatabaseInfo>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    targets: Vec<TargetInfo>,
    max_results: usize,
}

#[derive(Serialize)]
struct CameraInfo {
    width: u32,
    height: u32,
    fps: f32,
    pixel_format: String,
    row_order: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    focal_length: Option<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    principal_point: Option<[f32; 2]>,
}

#[derive(Serialize)]
struct TransformInfo {
    axis_flip: String,
    host_semantics: String,
    engine_semantics: String,
    optical_offset: String,
}

#[derive(Serialize)]
struct SequencerInfo {
    ordering_policy: String,
    pose_history: usize,
}

#[derive(Serialize)]
struct DatabaseInfo {
    category: String,
    path: String,
    target_count: usize,
}

#[derive(Serialize)]
struct TargetInfo {
    category: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    guide_view: Option<String>,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    if !args.config.exists() {
        anyhow::bail!("Configuration file not found: {}", args.config.display());
    }

    let blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if args.json {
        let info = build_config_info(&blueprint, args)?;
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&blueprint, args);
    }

    Ok(())
}

fn build_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) -> Result<ConfigInfo> {
    let intrinsics = blueprint
        .resolved_intrinsics()
        .context("Invalid intrinsics in configuration")?;
    let mode = &blueprint.camera.mode;
    let transform = &blueprint.transform;

    let databases = blueprint
        .databases
        .iter()
        .map(|db| DatabaseInfo {
            category: db.category.to_string(),
            path: db.path.display().to_string(),
            target_count: blueprint.targets_in(db.category).count(),
        })
        .collect();

    let targets = if args.targets {
        blueprint
            .targets
            .iter()
            .map(|t| TargetInfo {
                category: t.category.to_string(),
                name: t.name.clone(),
                guide_view: t.guide_view.clone(),
            })
            .collect()
    } else {
        Vec::new()
    };

    Ok(ConfigInfo {
        version: format!("{:?}", blueprint.version),
        camera: CameraInfo {
            width: mode.width,
            height: mode.height,
            fps: mode.fps,
            pixel_format: format!("{:?}", mode.pixel_format),
            row_order: format!("{:?}", blueprint.camera.row_order),
            focal_length: intrinsics.map(|k| k.focal_length),
            principal_point: intrinsics.map(|k| k.principal_point),
        },
        transform: TransformInfo {
            axis_flip: format!("{:?}", transform.axis_flip),
            host_semantics: format!("{:?}", transform.host_semantics),
            engine_semantics: format!("{:?}", transform.engine_semantics),
            optical_offset: format!(
                "{:?} {:?}",
                transform.optical_offset.mode, transform.optical_offset.offset
            ),
        },
        sequencer: SequencerInfo {
            ordering_policy: format!("{:?}", blueprint.sequencer.ordering_policy),
            pose_history: blueprint.sequencer.pose_history,
        },
        databases,
        targets,
        max_results: blueprint.query.max_results,
    })
}

fn print_config_info(blueprint: &BridgeBlueprint, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Quforia Bridge Configuration                   ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let mode = &blueprint.camera.mode;
    println!("📷 Camera");
    println!("   ├─ Version: {:?}", blueprint.version);
    println!(
        "   ├─ Mode: {}x{} @ {} fps ({:?})",
        mode.width, mode.height, mode.fps, mode.pixel_format
    );
    println!("   ├─ Row order: {:?}", blueprint.camera.row_order);
    match blueprint.resolved_intrinsics() {
        Ok(Some(k)) => println!(
            "   └─ Intrinsics: fx={} fy={} cx={} cy={}",
            k.focal_length[0], k.focal_length[1], k.principal_point[0], k.principal_point[1]
        ),
        Ok(None) => println!("   └─ Intrinsics: none (degraded mode)"),
        Err(e) => println!("   └─ Intrinsics: invalid ({e})"),
    }

    let transform = &blueprint.transform;
    println!("\n🧭 Transform");
    println!("   ├─ Axis flip: {:?}", transform.axis_flip);
    println!(
        "   ├─ Semantics: host {:?} → engine {:?}",
        transform.host_semantics, transform.engine_semantics
    );
    println!(
        "   └─ Optical offset: {:?} {:?}",
        transform.optical_offset.mode, transform.optical_offset.offset
    );

    println!("\n🗂  Databases ({})", blueprint.databases.len());
    for (i, db) in blueprint.databases.iter().enumerate() {
        let is_last = i == blueprint.databases.len() - 1;
        let prefix = if is_last { "└─" } else { "├─" };
        let child_prefix = if is_last { "   " } else { "│  " };
        println!("   {} {} ({})", prefix, db.category, db.path.display());

        let targets: Vec<_> = blueprint.targets_in(db.category).collect();
        if args.targets && !targets.is_empty() {
            for (j, target) in targets.iter().enumerate() {
                let target_prefix = if j == targets.len() - 1 { "└─" } else { "├─" };
                match &target.guide_view {
                    Some(view) => println!(
                        "   {}  {} {} (guide view: {})",
                        child_prefix, target_prefix, target.name, view
                    ),
                    None => println!("   {}  {} {}", child_prefix, target_prefix, target.name),
                }
            }
        } else {
            println!("   {}  └─ {} targets", child_prefix, targets.len());
        }
    }

    println!("\n⚙️  Sequencer");
    println!(
        "   ├─ Ordering policy: {:?}",
        blueprint.sequencer.ordering_policy
    );
    println!("   ├─ Pose history: {}", blueprint.sequencer.pose_history);
    println!("   └─ Max query results: {}", blueprint.query.max_results);

    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_loader::{ConfigFormat, ConfigLoader};

    const CONFIG: &str = r#"
[engine]
license_key = "dev"

[camera]
intrinsics = [640, 480, 500.0, 510.0, 320.0, 240.0, 0, 0, 0, 0, 0, 0, 0, 0]

[camera.mode]
width = 640
height = 480
fps = 30.0

[[databases]]
category = "planar"
path = "targets/planar.xml"

[[targets]]
category = "planar"
name = "Logo"

[[targets]]
category = "planar"
name = "Poster"
"#;

    fn args(targets: bool) -> InfoArgs {
        InfoArgs {
            config: "bridge.toml".into(),
            json: true,
            targets,
        }
    }

    #[test]
    fn test_build_config_info() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&blueprint, &args(false)).unwrap();

        assert_eq!(info.camera.focal_length, Some([500.0, 510.0]));
        assert_eq!(info.databases.len(), 1);
        assert_eq!(info.databases[0].target_count, 2);
        assert!(info.targets.is_empty());

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("targets").is_none());
    }

    #[test]
    fn test_build_config_info_with_targets() {
        let blueprint = ConfigLoader::load_from_str(CONFIG, ConfigFormat::Toml).unwrap();
        let info = build_config_info(&blueprint, &args(true)).unwrap();
        let names: Vec<_> = info.targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Logo", "Poster"]);
    }
}
