//! altforge configuration schema.
//!
//! Typed for serde YAML/JSON deserialization. The legacy `simple_config.json`
//! shape (`{"sheets": [{"id": ..., "name": ...}]}`) is a valid subset.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AltForgeConfig {
    /// Spreadsheets processed by the scheduler
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,

    /// When and how fast scheduled cycles run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<ScheduleConfig>,

    /// Vision model used to describe images
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision: Option<VisionConfig>,

    /// Google Sheets access
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google: Option<GoogleConfig>,

    /// Description length rules
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<DescriptionConfig>,

    /// HTTP upload server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,

    /// Scheduled run history
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_log: Option<RunLogConfig>,
}

// ---------------------------------------------------------------------------
// Sheets
// ---------------------------------------------------------------------------

fn default_sheet_name() -> String {
    "Sheet1".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetEntry {
    /// Spreadsheet id (the long token in the sheet URL)
    pub id: String,
    /// Sheet (tab) name
    #[serde(default = "default_sheet_name")]
    pub name: String,
}

// ---------------------------------------------------------------------------
// Schedule
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleConfig {
    /// Local time of day as "HH:MM", or "now" for a single immediate cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Delay between generation calls within one sheet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pacing_ms: Option<u64>,
    /// Wait after a failed cycle before re-entering the loop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backoff_secs: Option<u64>,
    /// Ceiling for the backoff after repeated failures
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_backoff_secs: Option<u64>,
    /// How often missing credentials are re-checked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_poll_secs: Option<u64>,
    /// Sheets processed concurrently within one cycle
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel_tables: Option<usize>,
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisionConfig {
    /// "gemini" | "openai"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleConfig {
    /// OAuth access token with the spreadsheets scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionConfig {
    /// Maximum characters per description; 0 disables the cap
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_chars: Option<usize>,
}

// ---------------------------------------------------------------------------
// Gateway / logging / run log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_upload_bytes: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    /// Directory for the rolling JSON log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLogConfig {
    /// SQLite file; the run log is disabled when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retain_days: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_json_shape_parses() {
        let raw = r#"{"sheets": [{"id": "abc", "name": "Products"}, {"id": "def"}]}"#;
        let config: AltForgeConfig = serde_yaml::from_str(raw).unwrap();
        assert_eq!(config.sheets.len(), 2);
        assert_eq!(config.sheets[0].name, "Products");
        assert_eq!(config.sheets[1].name, "Sheet1");
        assert!(config.schedule.is_none());
    }

    #[test]
    fn camel_case_yaml_parses() {
        let raw = r#"
sheets:
  - id: abc
schedule:
  time: "09:30"
  pacingMs: 2500
vision:
  provider: openai
  apiKey: "${OPENAI_API_KEY}"
runLog:
  path: runs.db
"#;
        let config: AltForgeConfig = serde_yaml::from_str(raw).unwrap();
        let schedule = config.schedule.unwrap();
        assert_eq!(schedule.time.as_deref(), Some("09:30"));
        assert_eq!(schedule.pacing_ms, Some(2500));
        assert_eq!(config.vision.unwrap().api_key.as_deref(), Some("${OPENAI_API_KEY}"));
        assert_eq!(config.run_log.unwrap().path.as_deref(), Some("runs.db"));
    }
}
