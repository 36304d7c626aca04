//! `info` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::EngineConfig;
use ingestion::PageKind;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    source: String,
    config: EngineConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pages: Vec<PageInfo>,
}

#[derive(Serialize)]
struct PageInfo {
    name: &'static str,
    file_name: &'static str,
    compressed: bool,
    telemetry: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let config = match args.config {
        Some(ref path) => {
            info!(config = %path.display(), "Loading configuration info");
            ConfigLoader::load_from_path(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if args.json {
        let info = build_config_info(config, args);
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&config, args);
    }

    Ok(())
}

fn build_config_info(config: EngineConfig, args: &InfoArgs) -> ConfigInfo {
    let source = match args.config {
        Some(ref path) => path.display().to_string(),
        None => "defaults".to_string(),
    };

    let pages = if args.pages {
        PageKind::ALL
            .iter()
            .map(|kind| PageInfo {
                name: kind.name(),
                file_name: kind.file_name(),
                compressed: kind.is_zipped(),
                telemetry: kind.is_telemetry(),
            })
            .collect()
    } else {
        Vec::new()
    };

    ConfigInfo {
        source,
        config,
        pages,
    }
}

fn print_config_info(config: &EngineConfig, args: &InfoArgs) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               Livetiming Configuration                       ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    let timing = &config.timing;
    println!("⏱  Timing");
    println!("   ├─ Late value window: {} ms", timing.late_value_window_ms);
    println!("   ├─ Pit lookahead: {} ms", timing.pit_lookahead_ms);
    println!("   └─ Max lap time: {} ms", timing.max_lap_time_ms);

    println!("\n🔗 Alignment");
    println!("   ├─ Enabled: {}", config.alignment.enabled);
    println!("   └─ Leader sentinel: {:?}", config.alignment.leader_sentinel);

    let telemetry = &config.telemetry;
    println!("\n📡 Telemetry");
    println!("   ├─ Enabled: {}", telemetry.enabled);
    println!("   ├─ Required: {}", telemetry.required);
    println!("   └─ Brake on value: {}", telemetry.brake_on_value);

    println!("\n⚙️  Runtime");
    println!("   ├─ Parallel: {}", config.runtime.parallel);
    if config.runtime.worker_threads == 0 {
        println!("   └─ Worker threads: (rayon default)");
    } else {
        println!("   └─ Worker threads: {}", config.runtime.worker_threads);
    }

    if args.pages {
        println!("\n📄 Pages ({})", PageKind::ALL.len());
        for (i, kind) in PageKind::ALL.iter().enumerate() {
            let prefix = if i + 1 == PageKind::ALL.len() { "└─" } else { "├─" };
            println!(
                "   {} {:<20} {}{}",
                prefix,
                kind.name(),
                kind.file_name(),
                if kind.is_zipped() { " (compressed)" } else { "" }
            );
        }
    }

    println!();
}
