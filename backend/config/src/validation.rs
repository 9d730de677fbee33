//! Config validation with user-friendly messages.

use chrono::NaiveTime;
use thiserror::Error;

use crate::schema::AltForgeConfig;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }
}

/// Whether a schedule time is `now` or a valid `HH:MM`.
pub fn is_valid_schedule_time(time: &str) -> bool {
    let time = time.trim();
    time.eq_ignore_ascii_case("now") || NaiveTime::parse_from_str(time, "%H:%M").is_ok()
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AltForgeConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_sheets(config, &mut report);
    validate_schedule(config, &mut report);
    validate_vision(config, &mut report);
    validate_description(config, &mut report);
    validate_gateway(config, &mut report);
    report
}

fn validate_sheets(config: &AltForgeConfig, report: &mut ValidationReport) {
    if config.sheets.is_empty() {
        report.warn("sheets", "No sheets configured; scheduled cycles will do nothing");
    }
    for (i, sheet) in config.sheets.iter().enumerate() {
        if sheet.id.trim().is_empty() {
            report.error(format!("sheets[{i}].id"), "Spreadsheet id cannot be empty");
        }
        if sheet.name.trim().is_empty() {
            report.error(format!("sheets[{i}].name"), "Sheet name cannot be empty");
        }
    }
}

fn validate_schedule(config: &AltForgeConfig, report: &mut ValidationReport) {
    let Some(schedule) = &config.schedule else { return };
    if let Some(time) = &schedule.time {
        if !is_valid_schedule_time(time) {
            report.error("schedule.time", format!("'{time}' is neither HH:MM nor 'now'"));
        }
    }
    if let Some(pacing) = schedule.pacing_ms {
        if pacing < 2_000 {
            report.warn("schedule.pacingMs", format!("{pacing} ms is below the 2000 ms floor; the floor is used"));
        }
    }
    if let (Some(base), Some(max)) = (schedule.backoff_secs, schedule.max_backoff_secs) {
        if base == 0 {
            report.error("schedule.backoffSecs", "Backoff must be > 0");
        }
        if max < base {
            report.warn("schedule.maxBackoffSecs", "Cap is below the base backoff; the base is used");
        }
    }
    if schedule.max_parallel_tables == Some(0) {
        report.error("schedule.maxParallelTables", "Must be at least 1");
    }
}

fn validate_vision(config: &AltForgeConfig, report: &mut ValidationReport) {
    let Some(vision) = &config.vision else { return };
    if let Some(provider) = &vision.provider {
        if !matches!(provider.to_lowercase().as_str(), "gemini" | "openai") {
            report.error("vision.provider", format!("Unknown provider '{provider}'; use gemini or openai"));
        }
    }
}

fn validate_description(config: &AltForgeConfig, report: &mut ValidationReport) {
    let Some(max) = config.description.as_ref().and_then(|d| d.max_chars) else { return };
    if (1..=3).contains(&max) {
        report.warn("description.maxChars", "Caps of 3 or fewer leave no room for text before '...'");
    }
}

fn validate_gateway(config: &AltForgeConfig, report: &mut ValidationReport) {
    let Some(gw) = &config.gateway else { return };
    if let Some(port) = gw.port {
        if port < 1024 && port != 80 && port != 443 {
            report.warn(
                "gateway.port",
                format!("Port {port} requires elevated privileges; consider using a port >= 1024"),
            );
        }
    }
    if gw.max_upload_bytes == Some(0) {
        report.error("gateway.maxUploadBytes", "Upload limit must be > 0");
    }
}
