//! `run` command implementation.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{EngineConfig, SessionTiming};
use ingestion::PageKind;
use tracing::{info, warn};

use crate::cli::RunArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `run` command
pub async fn run_session(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    info!(
        session_dir = %args.session_dir.display(),
        telemetry = config.telemetry.enabled,
        alignment = config.alignment.enabled,
        parallel = config.runtime.parallel,
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_dry_run(&args.session_dir);
        return Ok(());
    }

    if args.metrics_port != 0 {
        observability::init_metrics_only(args.metrics_port)?;
    }

    let pipeline = Pipeline::new(PipelineConfig {
        engine: config,
        session_dir: args.session_dir.clone(),
        timeout: if args.timeout == 0 {
            None
        } else {
            Some(Duration::from_secs(args.timeout))
        },
    });

    let (session, stats) = pipeline.run().await.context("Session processing failed")?;

    if let Some(ref path) = args.output {
        write_output(path, &session).await?;
        info!(path = %path.display(), "Result written");
    }

    if args.json {
        let json = serde_json::to_string_pretty(&session).context("Failed to serialize result")?;
        println!("{}", json);
    } else {
        stats.print_summary(&session);
    }

    if !session.report.integrity_errors.is_empty() {
        warn!(
            count = session.report.integrity_errors.len(),
            "Session finished with integrity errors"
        );
    }

    Ok(())
}

/// Load the configuration file (or defaults) and apply CLI overrides.
fn load_config(args: &RunArgs) -> Result<EngineConfig> {
    let mut config = match args.config {
        Some(ref path) => ConfigLoader::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => EngineConfig::default(),
    };

    if args.no_telemetry {
        info!("Telemetry disabled from CLI");
        config.telemetry.enabled = false;
        config.telemetry.required = false;
    }
    if args.sequential {
        config.runtime.parallel = false;
        config.runtime.worker_threads = 0;
    }

    ConfigLoader::validate(&config).context("Invalid configuration after CLI overrides")?;
    Ok(config)
}

async fn write_output(path: &Path, session: &SessionTiming) -> Result<()> {
    let json = serde_json::to_vec_pretty(session).context("Failed to serialize result")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

/// List which catalogue pages exist in the session directory
fn print_dry_run(dir: &Path) {
    println!("\n=== Session Pages: {} ===\n", dir.display());
    for kind in PageKind::ALL {
        let found = dir.join(kind.file_name()).is_file();
        println!(
            "  {} {:<32} {}",
            if found { "✓" } else { "·" },
            kind.file_name(),
            if kind.is_telemetry() { "(telemetry)" } else { "" }
        );
    }
    println!();
}
