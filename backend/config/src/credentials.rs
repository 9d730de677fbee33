//! Cycle-time credential resolution.
//!
//! Config values may still hold unresolved `${VAR}` references after loading.
//! Credentials are resolved again right before each scheduled cycle so that a
//! variable exported after startup is picked up without a restart.

use std::collections::HashMap;
use std::fmt;

use altforge_core::AltError;

use crate::defaults::{DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_VISION_PROVIDER};
use crate::env::substitute_str;
use crate::schema::AltForgeConfig;

pub const GEMINI_API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const OPENAI_API_KEY_VAR: &str = "OPENAI_API_KEY";
pub const GOOGLE_SHEETS_TOKEN_VAR: &str = "GOOGLE_SHEETS_TOKEN";

/// Vision provider settings with a resolved API key.
#[derive(Clone)]
pub struct VisionCredentials {
    pub provider: String,
    pub model: String,
    pub api_key: String,
}

impl fmt::Debug for VisionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VisionCredentials")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Everything the scheduled path needs to reach its collaborators.
#[derive(Clone)]
pub struct Credentials {
    pub vision: VisionCredentials,
    pub google_access_token: String,
    pub google_base_url: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("vision", &self.vision)
            .field("google_access_token", &"<redacted>")
            .field("google_base_url", &self.google_base_url)
            .finish()
    }
}

/// Fallback variable for the configured provider's API key.
pub fn vision_key_var(provider: &str) -> &'static str {
    if provider.eq_ignore_ascii_case("openai") {
        OPENAI_API_KEY_VAR
    } else {
        GEMINI_API_KEY_VAR
    }
}

/// Resolve a configured value, falling back to a well-known variable.
/// On failure returns the variable names that are missing.
fn pick(
    configured: Option<&str>,
    fallback_var: &str,
    env: &HashMap<String, String>,
) -> Result<String, Vec<String>> {
    if let Some(raw) = configured.map(str::trim).filter(|v| !v.is_empty()) {
        let (value, missing) = substitute_str(raw, env);
        return if missing.is_empty() { Ok(value) } else { Err(missing) };
    }
    env.get(fallback_var)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| vec![fallback_var.to_string()])
}

impl VisionCredentials {
    /// Resolve the vision section; the interactive path needs nothing else.
    pub fn resolve(config: &AltForgeConfig, env: &HashMap<String, String>) -> Result<Self, AltError> {
        let vision = config.vision.clone().unwrap_or_default();
        let provider = vision
            .provider
            .unwrap_or_else(|| DEFAULT_VISION_PROVIDER.to_string())
            .to_lowercase();
        let fallback_model = if provider == "openai" { DEFAULT_OPENAI_MODEL } else { DEFAULT_GEMINI_MODEL };
        let model = vision.model.unwrap_or_else(|| fallback_model.to_string());
        let api_key = pick(vision.api_key.as_deref(), vision_key_var(&provider), env)
            .map_err(AltError::ConfigurationMissing)?;
        Ok(Self { provider, model, api_key })
    }
}

impl Credentials {
    /// Resolve against an explicit environment map.
    /// Every missing variable is reported at once.
    pub fn resolve(config: &AltForgeConfig, env: &HashMap<String, String>) -> Result<Self, AltError> {
        let google = config.google.clone().unwrap_or_default();

        let mut missing = Vec::new();
        let vision = match VisionCredentials::resolve(config, env) {
            Ok(vision) => Some(vision),
            Err(AltError::ConfigurationMissing(vars)) => {
                missing.extend(vars);
                None
            }
            Err(other) => return Err(other),
        };
        let token = pick(google.access_token.as_deref(), GOOGLE_SHEETS_TOKEN_VAR, env)
            .map_err(|m| missing.extend(m))
            .ok();

        match (vision, token) {
            (Some(vision), Some(google_access_token)) => Ok(Self {
                vision,
                google_access_token,
                google_base_url: google.base_url,
            }),
            _ => {
                missing.dedup();
                Err(AltError::ConfigurationMissing(missing))
            }
        }
    }

    /// Resolve against the current process environment.
    pub fn from_process_env(config: &AltForgeConfig) -> Result<Self, AltError> {
        Self::resolve(config, &crate::env::process_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{GoogleConfig, VisionConfig};

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn falls_back_to_well_known_vars() {
        let creds = Credentials::resolve(
            &AltForgeConfig::default(),
            &env(&[("GEMINI_API_KEY", "g"), ("GOOGLE_SHEETS_TOKEN", "t")]),
        )
        .unwrap();
        assert_eq!(creds.vision.provider, "gemini");
        assert_eq!(creds.vision.api_key, "g");
        assert_eq!(creds.google_access_token, "t");
    }

    #[test]
    fn reports_every_missing_var() {
        let err = Credentials::resolve(&AltForgeConfig::default(), &HashMap::new()).unwrap_err();
        match err {
            AltError::ConfigurationMissing(vars) => {
                assert_eq!(vars, vec!["GEMINI_API_KEY", "GOOGLE_SHEETS_TOKEN"]);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn configured_references_resolve_late() {
        let mut config = AltForgeConfig::default();
        config.vision = Some(VisionConfig {
            provider: Some("openai".into()),
            api_key: Some("${MY_KEY}".into()),
            ..Default::default()
        });
        config.google = Some(GoogleConfig { access_token: Some("literal".into()), ..Default::default() });

        let err = Credentials::resolve(&config, &HashMap::new()).unwrap_err();
        assert!(err.to_string().contains("MY_KEY"));

        let creds = Credentials::resolve(&config, &env(&[("MY_KEY", "sk-1")])).unwrap();
        assert_eq!(creds.vision.api_key, "sk-1");
        assert_eq!(creds.vision.model, DEFAULT_OPENAI_MODEL);
        assert_eq!(creds.google_access_token, "literal");
    }

    #[test]
    fn vision_alone_needs_only_the_api_key() {
        let vision = VisionCredentials::resolve(&AltForgeConfig::default(), &env(&[("GEMINI_API_KEY", "g")])).unwrap();
        assert_eq!(vision.model, DEFAULT_GEMINI_MODEL);
        assert!(Credentials::resolve(&AltForgeConfig::default(), &env(&[("GEMINI_API_KEY", "g")])).is_err());
    }

    #[test]
    fn debug_output_hides_secrets() {
        let creds = Credentials::resolve(
            &AltForgeConfig::default(),
            &env(&[("GEMINI_API_KEY", "AIzaSecret"), ("GOOGLE_SHEETS_TOKEN", "ya29.tok")]),
        )
        .unwrap();
        let printed = format!("{creds:?}");
        assert!(!printed.contains("AIzaSecret"));
        assert!(!printed.contains("ya29.tok"));
    }
}
