//! `run` command implementation.

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");

    if !args.config.exists() {
        return Err(CliError::config_not_found(args.config.display().to_string()).into());
    }

    let mut blueprint = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    // Apply CLI overrides
    if let Some(ref key) = args.license_key {
        info!("Overriding engine license key from CLI/environment");
        blueprint.engine.license_key = key.clone();
        config_loader::validate(&blueprint).context("License key override is invalid")?;
    }

    info!(
        width = blueprint.camera.mode.width,
        height = blueprint.camera.mode.height,
        fps = blueprint.camera.mode.fps,
        databases = blueprint.databases.len(),
        targets = blueprint.targets.len(),
        ordering_policy = ?blueprint.sequencer.ordering_policy,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&blueprint);
        return Ok(());
    }

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        max_frames: (args.max_frames > 0).then_some(args.max_frames),
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
        query_every: (args.query_every > 0).then_some(args.query_every),
        metrics_port: (args.metrics_port > 0).then_some(args.metrics_port),
    });

    // The signal task flips the watch; the capture loop stops at its next tick
    // and the pipeline shuts the session down on this task.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let signal_task = tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Received shutdown signal, stopping bridge...");
        let _ = shutdown_tx.send(true);
    });

    info!("Starting bridge...");
    let result = pipeline.run(shutdown_rx).await;
    signal_task.abort();

    let stats = result.context("Bridge run failed")?;
    info!(
        frames = stats.feed.total_ticks,
        frames_rejected = stats.feed.frames_rejected,
        ordering_violations = stats.sequencer.ordering_violations(),
        duration_secs = stats.duration.as_secs_f64(),
        "Bridge finished"
    );
    stats.print_summary();
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(blueprint: &contracts::BridgeBlueprint) {
    let mode = &blueprint.camera.mode;
    println!("\n=== Configuration Summary ===\n");
    println!("Camera:");
    println!(
        "  Mode: {}x{} @ {} fps ({:?})",
        mode.width, mode.height, mode.fps, mode.pixel_format
    );
    println!("  Row order: {:?}", blueprint.camera.row_order);
    println!(
        "  Intrinsics: {}",
        if blueprint.camera.intrinsics.is_some() {
            "configured"
        } else {
            "none (degraded mode)"
        }
    );

    println!("\nDatabases ({}):", blueprint.databases.len());
    for database in &blueprint.databases {
        println!("  - {} ({})", database.category, database.path.display());
    }

    println!("\nTargets ({}):", blueprint.targets.len());
    for target in &blueprint.targets {
        println!("  - {} [{}]", target.name, target.category);
    }

    println!("\nSequencer:");
    println!("  Ordering policy: {:?}", blueprint.sequencer.ordering_policy);
    println!("  Pose history: {}", blueprint.sequencer.pose_history);

    println!();
}
