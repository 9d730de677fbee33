//! Vision description: turn image bytes into short alt text with a vision LLM.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use tracing::{debug, info};

use altforge_core::{AltError, AltResult, TextGenerator};

use crate::mime::sniff_image_mime;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

pub const ALT_TEXT_PROMPT: &str = "You are an expert at creating SEO-friendly alt text. \
Generate descriptive, professional alt text for this image. Keep it under 125 characters, \
focus on the main subject and important details. Don't start with 'Image of' or 'Picture of' - \
describe directly what you see.";

/// Supported vision providers.
#[derive(Debug, Clone)]
pub enum VisionProvider {
    OpenAI { api_key: String, model: String },
    Gemini { api_key: String, model: String },
}

impl VisionProvider {
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::OpenAI { api_key: api_key.into(), model: DEFAULT_OPENAI_MODEL.to_string() }
    }

    pub fn gemini(api_key: impl Into<String>) -> Self {
        Self::Gemini { api_key: api_key.into(), model: DEFAULT_GEMINI_MODEL.to_string() }
    }

    /// Provider by its config name (`gemini` or `openai`, any case).
    pub fn by_name(name: &str, api_key: impl Into<String>) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "gemini" => Some(Self::gemini(api_key)),
            "openai" => Some(Self::openai(api_key)),
            _ => None,
        }
    }

    pub fn with_model(self, model: impl Into<String>) -> Self {
        let model = model.into();
        match self {
            Self::OpenAI { api_key, .. } => Self::OpenAI { api_key, model },
            Self::Gemini { api_key, .. } => Self::Gemini { api_key, model },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::OpenAI { .. } => "openai",
            Self::Gemini { .. } => "gemini",
        }
    }
}

/// Generation settings shared by both providers.
#[derive(Debug, Clone)]
pub struct DescribeOptions {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for DescribeOptions {
    fn default() -> Self {
        Self { prompt: ALT_TEXT_PROMPT.to_string(), max_tokens: 500, temperature: 0.3 }
    }
}

/// Describe an image from raw bytes using a vision LLM.
pub async fn describe_image(
    client: &Client,
    provider: &VisionProvider,
    image_bytes: &[u8],
    mime_type: &str,
    options: &DescribeOptions,
) -> Result<String> {
    let b64 = STANDARD.encode(image_bytes);
    let text = match provider {
        VisionProvider::OpenAI { api_key, model } => {
            describe_via_openai(client, api_key, model, &b64, mime_type, options).await?
        }
        VisionProvider::Gemini { api_key, model } => {
            describe_via_gemini(client, api_key, model, &b64, mime_type, options).await?
        }
    };
    Ok(text.trim().to_string())
}

async fn describe_via_openai(
    client: &Client, api_key: &str, model: &str, b64: &str, mime_type: &str,
    options: &DescribeOptions,
) -> Result<String> {
    info!("[Vision] Describing image via OpenAI {}", model);
    let body = serde_json::json!({
        "model": model,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": options.prompt },
                { "type": "image_url",
                  "image_url": { "url": format!("data:{};base64,{}", mime_type, b64) } }
            ]
        }],
        "max_tokens": options.max_tokens,
        "temperature": options.temperature
    });
    let resp = client
        .post(format!("{OPENAI_BASE_URL}/chat/completions"))
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .context("OpenAI vision request failed")?;
    if !resp.status().is_success() {
        let status = resp.status();
        bail!("OpenAI vision error {}: {}", status, resp.text().await.unwrap_or_default());
    }
    let json: serde_json::Value = resp.json().await.context("Failed to parse OpenAI response")?;
    Ok(json["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string())
}

async fn describe_via_gemini(
    client: &Client, api_key: &str, model: &str, b64: &str, mime_type: &str,
    options: &DescribeOptions,
) -> Result<String> {
    info!("[Vision] Describing image via Gemini {}", model);
    let url = format!("{GEMINI_BASE_URL}/models/{model}:generateContent");
    let body = serde_json::json!({
        "contents": [{ "parts": [
            { "inlineData": { "mimeType": mime_type, "data": b64 } },
            { "text": options.prompt }
        ]}],
        "generationConfig": {
            "maxOutputTokens": options.max_tokens,
            "temperature": options.temperature
        }
    });
    // API key in a header, never in the query string.
    let resp = client
        .post(&url)
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
        .context("Gemini vision request failed")?;
    if !resp.status().is_success() {
        let status = resp.status();
        bail!("Gemini vision error {}: {}", status, resp.text().await.unwrap_or_default());
    }
    let json: serde_json::Value = resp.json().await.context("Failed to parse Gemini response")?;
    Ok(json["candidates"][0]["content"]["parts"][0]["text"]
        .as_str()
        .unwrap_or("")
        .to_string())
}

/// [`TextGenerator`] backed by a vision provider.
pub struct VisionDescriber {
    client: Client,
    provider: VisionProvider,
    options: DescribeOptions,
}

impl VisionDescriber {
    pub fn new(provider: VisionProvider) -> Self {
        Self { client: Client::new(), provider, options: DescribeOptions::default() }
    }
}

#[async_trait]
impl TextGenerator for VisionDescriber {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn generate(&self, image: &[u8]) -> AltResult<String> {
        let mime = sniff_image_mime(image);
        debug!(bytes = image.len(), mime, provider = self.provider.name(), "Describing image");
        describe_image(&self.client, &self.provider, image, mime, &self.options)
            .await
            .map_err(|e| AltError::Generation(format!("{e:#}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_model_keeps_the_key() {
        let provider = VisionProvider::gemini("k").with_model("gemini-2.5-pro");
        match provider {
            VisionProvider::Gemini { api_key, model } => {
                assert_eq!(api_key, "k");
                assert_eq!(model, "gemini-2.5-pro");
            }
            other => panic!("unexpected provider {other:?}"),
        }
    }

    #[test]
    fn providers_by_config_name() {
        assert_eq!(VisionProvider::by_name("OpenAI", "k").map(|p| p.name()), Some("openai"));
        assert_eq!(VisionProvider::by_name("gemini", "k").map(|p| p.name()), Some("gemini"));
        assert!(VisionProvider::by_name("llava", "k").is_none());
    }

    #[test]
    fn default_options_match_alt_text_limits() {
        let options = DescribeOptions::default();
        assert!(options.prompt.contains("125 characters"));
        assert!((options.temperature - 0.3).abs() < f32::EPSILON);
    }
}
