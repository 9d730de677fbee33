/// Image download for row references.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use tracing::{debug, warn};

use altforge_core::{AltError, AltResult, ImageFetcher};

use crate::mime::{is_html, is_image};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/124.0 Safari/537.36";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reject responses whose declared type is not an image.
pub fn check_content_type(content_type: Option<&str>) -> AltResult<()> {
    let content_type = content_type.unwrap_or("");
    if is_image(content_type) {
        return Ok(());
    }
    if is_html(content_type) {
        return Err(AltError::Download(
            "URL points to a webpage, not an image; use a direct image URL".to_string(),
        ));
    }
    Err(AltError::Download(format!(
        "invalid content type '{content_type}', expected image/*"
    )))
}

/// Fetches images over HTTP(S).
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: Client,
    timeout: Duration,
}

impl Default for HttpImageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        Self { client: Client::new(), timeout: DEFAULT_TIMEOUT }
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> AltResult<Vec<u8>> {
        debug!(url, "Downloading image");
        let resp = self
            .client
            .get(url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| AltError::Download(format!("request to {url} failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            warn!(url, %status, "Image download rejected");
            return Err(AltError::Download(format!("{url} returned {status}")));
        }

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        check_content_type(content_type.as_deref())?;

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| AltError::Download(format!("reading body of {url} failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
