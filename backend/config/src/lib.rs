//! `altforge-config`: runtime configuration for altforge.
//!
//! Provides:
//! - Typed config schema (tracked sheets, schedule, collaborators, gateway)
//! - YAML/JSON loading with path discovery
//! - `${ENV_VAR}` substitution and cycle-time credential resolution
//! - Default value application
//! - Validation with errors and warnings

pub mod credentials;
pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use credentials::{
    Credentials, VisionCredentials, GEMINI_API_KEY_VAR, GOOGLE_SHEETS_TOKEN_VAR, OPENAI_API_KEY_VAR,
};
pub use defaults::apply_all_defaults;
pub use env::{apply_env_overrides, process_env, resolve_env_vars_lenient, substitute_str};
pub use io::{config_dir, config_file_path, load_config, parse_config};
pub use schema::{
    AltForgeConfig, DescriptionConfig, GatewayConfig, GoogleConfig, LoggingConfig, RunLogConfig,
    ScheduleConfig, SheetEntry, VisionConfig,
};
pub use validation::{is_valid_schedule_time, validate, ConfigValidationError, ValidationReport};

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;

/// Substitute env vars, apply overrides and defaults, then validate.
///
/// Unresolved references are logged and left in place; credentials are
/// checked again at cycle time by [`Credentials::resolve`].
pub fn prepare(config: AltForgeConfig, env: &HashMap<String, String>) -> Result<AltForgeConfig> {
    let value: Value =
        serde_json::to_value(&config).context("Failed to serialize config for processing")?;

    let (value, missing) = resolve_env_vars_lenient(&value, env);
    for (var, path) in &missing {
        tracing::warn!(var = %var, path = %path, "Config references an unset env var");
    }

    let config: AltForgeConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;
    let config = apply_all_defaults(apply_env_overrides(config, env));

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }
    if let Some(first) = report.errors.into_iter().next() {
        return Err(first).context("Config is invalid");
    }

    Ok(config)
}
