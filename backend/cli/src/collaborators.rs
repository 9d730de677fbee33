//! Wiring from configuration to live collaborators.

use std::sync::Arc;

use anyhow::anyhow;

use altforge_config::{AltForgeConfig, Credentials, VisionCredentials};
use altforge_core::{AltError, AltResult, TextGenerator};
use altforge_scheduler::{CollaboratorFactory, Collaborators};
use altforge_sheets::GoogleSheetsClient;
use altforge_vision::{HttpImageFetcher, VisionDescriber, VisionProvider};

/// Vision generator for resolved credentials.
pub fn generator_from(vision: &VisionCredentials) -> AltResult<Arc<dyn TextGenerator>> {
    let provider = VisionProvider::by_name(&vision.provider, vision.api_key.clone())
        .ok_or_else(|| AltError::Other(anyhow!("unknown vision provider '{}'", vision.provider)))?
        .with_model(vision.model.clone());
    Ok(Arc::new(VisionDescriber::new(provider)))
}

/// Resolves credentials from the process environment before every cycle.
pub struct LiveCollaborators {
    config: AltForgeConfig,
    fetcher: Arc<HttpImageFetcher>,
}

impl LiveCollaborators {
    pub fn new(config: AltForgeConfig) -> Self {
        Self { config, fetcher: Arc::new(HttpImageFetcher::new()) }
    }
}

impl CollaboratorFactory for LiveCollaborators {
    fn build(&self) -> AltResult<Collaborators> {
        let creds = Credentials::from_process_env(&self.config)?;
        let mut sheets = GoogleSheetsClient::new(creds.google_access_token.clone());
        if let Some(url) = &creds.google_base_url {
            sheets = sheets.with_base_url(url.clone());
        }
        Ok(Collaborators {
            stores: Arc::new(sheets),
            fetcher: self.fetcher.clone(),
            generator: generator_from(&creds.vision)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vision(provider: &str) -> VisionCredentials {
        VisionCredentials { provider: provider.into(), model: "m".into(), api_key: "k".into() }
    }

    #[test]
    fn known_providers_build_generators() {
        assert_eq!(generator_from(&vision("gemini")).unwrap().name(), "gemini");
        assert_eq!(generator_from(&vision("openai")).unwrap().name(), "openai");
    }

    #[test]
    fn unknown_provider_is_an_error() {
        let err = generator_from(&vision("llava")).err().unwrap();
        assert!(err.to_string().contains("llava"));
    }
}
