//! `validate` command implementation.

use anyhow::{Context, Result};
use contracts::EngineConfig;
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
    max_lap_time_ms: u64,
    alignment: bool,
    telemetry: bool,
    telemetry_required: bool,
    parallel: bool,
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
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    max_lap_time_ms: config.timing.max_lap_time_ms,
                    alignment: config.alignment.enabled,
                    telemetry: config.telemetry.enabled,
                    telemetry_required: config.telemetry.required,
                    parallel: config.runtime.parallel,
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

/// Non-fatal configuration issues
fn collect_warnings(config: &EngineConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.alignment.enabled {
        warnings.push("alignment.enabled is false - lap end times stay per-driver".to_string());
    }

    if !config.telemetry.enabled {
        warnings.push("telemetry.enabled is false - car and position pages are ignored".to_string());
    }

    if config.timing.late_value_window_ms > config.timing.max_lap_time_ms / 10 {
        warnings.push(format!(
            "timing.late_value_window_ms ({}) is large relative to max_lap_time_ms ({})",
            config.timing.late_value_window_ms, config.timing.max_lap_time_ms
        ));
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Max lap time: {} ms", summary.max_lap_time_ms);
            println!("  Alignment: {}", summary.alignment);
            println!(
                "  Telemetry: {} (required: {})",
                summary.telemetry, summary.telemetry_required
            );
            println!("  Parallel: {}", summary.parallel);
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
