//! Avatar fetch over HTTP
//!
//! Each lookup makes up to `max_retries` attempts with a fixed pause in
//! between. An attempt fails on transport errors, non-200 responses and
//! payloads that do not decode as an image.

use crate::config::AvatarConfig;
use crate::enrich::AvatarSource;
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Fetches avatars from a URL template such as
/// `http://q1.qlogo.cn/g?b=qq&nk={user_id}&s=100`.
pub struct HttpAvatarSource {
    http_client: reqwest::Client,
    url_template: String,
    max_retries: usize,
    retry_delay: Duration,
}

impl HttpAvatarSource {
    pub fn new(config: &AvatarConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            url_template: config.url_template.clone(),
            max_retries: config.max_retries.max(1),
            retry_delay: config.retry_delay(),
        })
    }

    pub fn avatar_url(&self, user_id: &str) -> String {
        self.url_template
            .replace("{user_id}", &urlencoding::encode(user_id))
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| format!("HTTP request failed: {e}"))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(format!("HTTP {status}"));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| format!("failed to read body: {e}"))?;
        image::load_from_memory(&bytes).map_err(|e| format!("invalid image data: {e}"))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl AvatarSource for HttpAvatarSource {
    async fn get_avatar(&self, user_id: &str) -> Result<Vec<u8>> {
        let url = self.avatar_url(user_id);
        let mut last_error = String::new();

        for attempt in 1..=self.max_retries {
            match self.fetch_once(&url).await {
                Ok(bytes) => return Ok(bytes),
                Err(e) => {
                    tracing::warn!(
                        user_id,
                        attempt,
                        max_retries = self.max_retries,
                        error = %e,
                        "Avatar fetch failed"
                    );
                    last_error = e;
                }
            }
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }

        Err(Error::Avatar(format!(
            "user {} after {} attempts: {}",
            user_id, self.max_retries, last_error
        )))
    }
}
