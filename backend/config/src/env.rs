//! Environment variable substitution for config values.
//!
//! String values may reference `${VAR_NAME}` (uppercase `[A-Z_][A-Z0-9_]*`).
//! `$${VAR}` is an escape and becomes the literal `${VAR}`.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;
use std::collections::HashMap;

use crate::schema::{AltForgeConfig, ScheduleConfig};

/// Optional leading `$` marks an escaped reference.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Overrides `schedule.time`, including the `now` test mode.
pub const SCHEDULE_TIME_VAR: &str = "SCHEDULE_TIME";

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute references in one string, leaving unresolved ones in place.
/// Returns the new string and the names that could not be resolved.
pub fn substitute_str(s: &str, env: &HashMap<String, String>) -> (String, Vec<String>) {
    if !s.contains('$') {
        return (s.to_string(), Vec::new());
    }
    let mut missing = Vec::new();
    let out = ENV_VAR_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.push(name.to_string());
                caps[0].to_string()
            }
        }
    });
    (out.into_owned(), missing)
}

fn walk(value: &Value, env: &HashMap<String, String>, path: &str, missing: &mut Vec<(String, String)>) -> Value {
    match value {
        Value::String(s) => {
            let (out, unresolved) = substitute_str(s, env);
            missing.extend(unresolved.into_iter().map(|name| (name, path.to_string())));
            Value::String(out)
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| walk(v, env, &format!("{path}[{i}]"), missing))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let child = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                    (k.clone(), walk(v, env, &child, missing))
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Substitute what can be resolved and report the rest as `(var, path)` pairs.
///
/// Used at startup so the scheduler can wait for credentials that are not
/// exported yet instead of refusing to start.
pub fn resolve_env_vars_lenient(
    value: &Value,
    env: &HashMap<String, String>,
) -> (Value, Vec<(String, String)>) {
    let mut missing = Vec::new();
    let out = walk(value, env, "", &mut missing);
    (out, missing)
}

/// Apply direct environment overrides that bypass the config file.
pub fn apply_env_overrides(mut config: AltForgeConfig, env: &HashMap<String, String>) -> AltForgeConfig {
    if let Some(time) = env.get(SCHEDULE_TIME_VAR).filter(|t| !t.trim().is_empty()) {
        config
            .schedule
            .get_or_insert_with(ScheduleConfig::default)
            .time = Some(time.trim().to_string());
    }
    config
}
