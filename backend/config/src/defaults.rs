//! Config defaults: fills every optional section the runtime depends on.

use crate::schema::{
    AltForgeConfig, DescriptionConfig, GatewayConfig, GoogleConfig, LoggingConfig, ScheduleConfig,
    VisionConfig,
};

/// Daily run time when none is configured.
pub const DEFAULT_SCHEDULE_TIME: &str = "09:00";

/// Delay between generation calls; also the enforced floor.
pub const DEFAULT_PACING_MS: u64 = 2_000;

pub const DEFAULT_BACKOFF_SECS: u64 = 10;
pub const DEFAULT_MAX_BACKOFF_SECS: u64 = 300;
pub const DEFAULT_CONFIG_POLL_SECS: u64 = 60;
pub const DEFAULT_MAX_PARALLEL_TABLES: usize = 1;

pub const DEFAULT_VISION_PROVIDER: &str = "gemini";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

pub const DEFAULT_MAX_CHARS: usize = 125;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_OUTPUT_DIR: &str = "temp";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: AltForgeConfig) -> AltForgeConfig {
    let config = apply_schedule_defaults(config);
    let config = apply_vision_defaults(config);
    let config = apply_description_defaults(config);
    let config = apply_gateway_defaults(config);
    apply_logging_defaults(config)
}

fn apply_schedule_defaults(mut config: AltForgeConfig) -> AltForgeConfig {
    let schedule = config.schedule.get_or_insert_with(ScheduleConfig::default);
    schedule.time.get_or_insert_with(|| DEFAULT_SCHEDULE_TIME.to_string());
    schedule.pacing_ms.get_or_insert(DEFAULT_PACING_MS);
    schedule.backoff_secs.get_or_insert(DEFAULT_BACKOFF_SECS);
    schedule.max_backoff_secs.get_or_insert(DEFAULT_MAX_BACKOFF_SECS);
    schedule.config_poll_secs.get_or_insert(DEFAULT_CONFIG_POLL_SECS);
    schedule.max_parallel_tables.get_or_insert(DEFAULT_MAX_PARALLEL_TABLES);
    config
}

/// Provider defaults to Gemini; the model follows the provider.
fn apply_vision_defaults(mut config: AltForgeConfig) -> AltForgeConfig {
    let vision = config.vision.get_or_insert_with(VisionConfig::default);
    let provider = vision
        .provider
        .get_or_insert_with(|| DEFAULT_VISION_PROVIDER.to_string())
        .to_lowercase();
    if vision.model.is_none() {
        let model = if provider == "openai" { DEFAULT_OPENAI_MODEL } else { DEFAULT_GEMINI_MODEL };
        vision.model = Some(model.to_string());
    }
    config.google.get_or_insert_with(GoogleConfig::default);
    config
}

fn apply_description_defaults(mut config: AltForgeConfig) -> AltForgeConfig {
    let description = config.description.get_or_insert_with(DescriptionConfig::default);
    description.max_chars.get_or_insert(DEFAULT_MAX_CHARS);
    config
}

fn apply_gateway_defaults(mut config: AltForgeConfig) -> AltForgeConfig {
    let gateway = config.gateway.get_or_insert_with(GatewayConfig::default);
    gateway.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    gateway.port.get_or_insert(DEFAULT_PORT);
    gateway.upload_dir.get_or_insert_with(|| DEFAULT_UPLOAD_DIR.to_string());
    gateway.output_dir.get_or_insert_with(|| DEFAULT_OUTPUT_DIR.to_string());
    gateway.max_upload_bytes.get_or_insert(DEFAULT_MAX_UPLOAD_BYTES);
    config
}

fn apply_logging_defaults(mut config: AltForgeConfig) -> AltForgeConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_gets_every_default() {
        let config = apply_all_defaults(AltForgeConfig::default());
        let schedule = config.schedule.unwrap();
        assert_eq!(schedule.time.as_deref(), Some("09:00"));
        assert_eq!(schedule.pacing_ms, Some(2_000));
        assert_eq!(schedule.backoff_secs, Some(10));
        assert_eq!(schedule.max_backoff_secs, Some(300));
        assert_eq!(config.description.unwrap().max_chars, Some(125));
        let gateway = config.gateway.unwrap();
        assert_eq!(gateway.port, Some(5000));
        assert_eq!(gateway.upload_dir.as_deref(), Some("uploads"));
        assert_eq!(config.vision.unwrap().model.as_deref(), Some(DEFAULT_GEMINI_MODEL));
    }

    #[test]
    fn explicit_values_are_kept() {
        let mut config = AltForgeConfig::default();
        config.schedule = Some(ScheduleConfig { time: Some("now".into()), ..Default::default() });
        config.vision = Some(VisionConfig { provider: Some("OpenAI".into()), ..Default::default() });
        let config = apply_all_defaults(config);
        assert_eq!(config.schedule.unwrap().time.as_deref(), Some("now"));
        assert_eq!(config.vision.unwrap().model.as_deref(), Some(DEFAULT_OPENAI_MODEL));
    }
}
