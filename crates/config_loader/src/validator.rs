//! Engine config validation
//!
//! Rules:
//! - field ranges and non-empty strings (declared on the contract types)
//! - pit lookahead and late-value windows shorter than the maximum lap time
//! - no worker pool size when parallel processing is off
//! - a required telemetry page cannot be disabled

use std::borrow::Cow;

use contracts::{ContractError, EngineConfig};
use ::validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Validate an `EngineConfig`.
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &EngineConfig) -> Result<(), ContractError> {
    validate_fields(config)?;
    validate_timing_windows(config)?;
    validate_runtime(config)?;
    validate_telemetry(config)?;
    Ok(())
}

/// Field-level rules from the `Validate` derive
fn validate_fields(config: &EngineConfig) -> Result<(), ContractError> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let mut flat = Vec::new();
    flatten_errors("", &errors, &mut flat);
    flat.sort();

    match flat.into_iter().next() {
        Some((field, message)) => Err(ContractError::config_validation(field, message)),
        None => Err(ContractError::config_validation("", errors.to_string())),
    }
}

fn flatten_errors(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (name, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            name.to_string()
        } else {
            format!("{prefix}.{name}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .clone()
                        .unwrap_or_else(|| Cow::Owned(describe_check(err)));
                    out.push((path.clone(), message.into_owned()));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten_errors(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

fn describe_check(err: &ValidationError) -> String {
    let mut bounds: Vec<String> = err
        .params
        .iter()
        .filter(|(k, _)| *k != "value")
        .map(|(k, v)| format!("{k}={v}"))
        .collect();
    bounds.sort();
    match err.params.get("value") {
        Some(value) => format!(
            "failed '{}' check ({}), got {}",
            err.code,
            bounds.join(", "),
            value
        ),
        None => format!("failed '{}' check ({})", err.code, bounds.join(", ")),
    }
}

/// Windows that attribute values to neighbouring laps must stay below a lap
fn validate_timing_windows(config: &EngineConfig) -> Result<(), ContractError> {
    let timing = &config.timing;

    if timing.late_value_window_ms >= timing.max_lap_time_ms {
        return Err(ContractError::config_validation(
            "timing.late_value_window_ms / timing.max_lap_time_ms",
            format!(
                "late_value_window_ms ({}) must be < max_lap_time_ms ({})",
                timing.late_value_window_ms, timing.max_lap_time_ms
            ),
        ));
    }

    if timing.pit_lookahead_ms >= timing.max_lap_time_ms {
        return Err(ContractError::config_validation(
            "timing.pit_lookahead_ms / timing.max_lap_time_ms",
            format!(
                "pit_lookahead_ms ({}) must be < max_lap_time_ms ({})",
                timing.pit_lookahead_ms, timing.max_lap_time_ms
            ),
        ));
    }

    Ok(())
}

fn validate_runtime(config: &EngineConfig) -> Result<(), ContractError> {
    let runtime = &config.runtime;
    if !runtime.parallel && runtime.worker_threads > 0 {
        return Err(ContractError::config_validation(
            "runtime.worker_threads",
            format!(
                "worker_threads ({}) requires runtime.parallel = true",
                runtime.worker_threads
            ),
        ));
    }
    Ok(())
}

fn validate_telemetry(config: &EngineConfig) -> Result<(), ContractError> {
    let telemetry = &config.telemetry;
    if telemetry.required && !telemetry.enabled {
        return Err(ContractError::config_validation(
            "telemetry.required",
            "telemetry cannot be required while telemetry.enabled = false",
        ));
    }
    Ok(())
}
