use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use altforge_config::defaults::{
    DEFAULT_BIND, DEFAULT_LOG_DIR, DEFAULT_LOG_LEVEL, DEFAULT_MAX_PARALLEL_TABLES,
    DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_OUTPUT_DIR, DEFAULT_PACING_MS, DEFAULT_PORT,
    DEFAULT_UPLOAD_DIR,
};
use altforge_config::AltForgeConfig;
use altforge_engine::DescriptionPolicy;

/// Run log entries older than this are pruned at startup.
pub const DEFAULT_RUN_LOG_RETAIN_DAYS: u32 = 30;

/// Flattened runtime settings for the binary.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// HTTP server bind address
    pub bind_address: String,
    /// HTTP server port
    pub port: u16,
    /// Uploaded files are stored here under unique names
    pub upload_dir: PathBuf,
    /// Files produced by the download endpoint
    pub output_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub log_level: String,
    pub log_dir: PathBuf,
    /// SQLite run log; disabled when `None`
    pub run_log_path: Option<String>,
    pub run_log_retain_days: u32,
    pub pacing: Duration,
    pub max_parallel_tables: usize,
    pub policy: DescriptionPolicy,
}

impl RuntimeConfig {
    /// Flatten a prepared config. Missing sections fall back to the defaults.
    pub fn from_config(config: &AltForgeConfig) -> Self {
        let gateway = config.gateway.clone().unwrap_or_default();
        let logging = config.logging.clone().unwrap_or_default();
        let schedule = config.schedule.clone().unwrap_or_default();
        let run_log = config.run_log.clone().unwrap_or_default();
        let policy = config
            .description
            .as_ref()
            .and_then(|d| d.max_chars)
            .map(DescriptionPolicy::from_limit)
            .unwrap_or_default();

        Self {
            bind_address: gateway.bind.unwrap_or_else(|| DEFAULT_BIND.to_string()),
            port: gateway.port.unwrap_or(DEFAULT_PORT),
            upload_dir: PathBuf::from(gateway.upload_dir.unwrap_or_else(|| DEFAULT_UPLOAD_DIR.to_string())),
            output_dir: PathBuf::from(gateway.output_dir.unwrap_or_else(|| DEFAULT_OUTPUT_DIR.to_string())),
            max_upload_bytes: gateway.max_upload_bytes.unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            log_level: logging.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_dir: PathBuf::from(logging.dir.unwrap_or_else(|| DEFAULT_LOG_DIR.to_string())),
            run_log_path: run_log.path.filter(|p| !p.trim().is_empty()),
            run_log_retain_days: run_log.retain_days.unwrap_or(DEFAULT_RUN_LOG_RETAIN_DAYS),
            pacing: Duration::from_millis(schedule.pacing_ms.unwrap_or(DEFAULT_PACING_MS)),
            max_parallel_tables: schedule
                .max_parallel_tables
                .unwrap_or(DEFAULT_MAX_PARALLEL_TABLES)
                .max(1),
            policy,
        }
    }

    /// `ALTFORGE_BIND` and `ALTFORGE_PORT` win over the file.
    pub fn with_env_overrides(mut self, env: &HashMap<String, String>) -> Self {
        if let Some(bind) = env.get("ALTFORGE_BIND").filter(|b| !b.trim().is_empty()) {
            self.bind_address = bind.trim().to_string();
        }
        if let Some(port) = env.get("ALTFORGE_PORT").and_then(|p| p.trim().parse().ok()) {
            self.port = port;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use altforge_config::{apply_all_defaults, DescriptionConfig};

    #[test]
    fn flattens_defaulted_config() {
        let runtime = RuntimeConfig::from_config(&apply_all_defaults(AltForgeConfig::default()));
        assert_eq!(runtime.port, 5000);
        assert_eq!(runtime.upload_dir, PathBuf::from("uploads"));
        assert_eq!(runtime.output_dir, PathBuf::from("temp"));
        assert_eq!(runtime.max_upload_bytes, 16 * 1024 * 1024);
        assert_eq!(runtime.pacing, Duration::from_secs(2));
        assert_eq!(runtime.policy, DescriptionPolicy::default());
        assert!(runtime.run_log_path.is_none());
    }

    #[test]
    fn zero_max_chars_disables_the_cap() {
        let mut config = AltForgeConfig::default();
        config.description = Some(DescriptionConfig { max_chars: Some(0) });
        assert_eq!(RuntimeConfig::from_config(&config).policy, DescriptionPolicy::unlimited());
    }

    #[test]
    fn env_overrides_bind_and_port() {
        let env: HashMap<String, String> = [("ALTFORGE_PORT", "8081"), ("ALTFORGE_BIND", "127.0.0.1")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let runtime = RuntimeConfig::from_config(&AltForgeConfig::default()).with_env_overrides(&env);
        assert_eq!(runtime.port, 8081);
        assert_eq!(runtime.bind_address, "127.0.0.1");
    }
}
