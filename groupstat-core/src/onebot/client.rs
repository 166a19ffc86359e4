//! HTTP client for the OneBot v11 API

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::OneBotConfig;
use crate::enrich::MemberDirectory;
use crate::error::{Error, Result};
use crate::history::HistorySource;
use crate::schedule::Notifier;
use crate::types::Event;

/// Envelope every OneBot action answers with
#[derive(Debug, Deserialize)]
struct ActionResponse {
    status: String,
    #[serde(default)]
    retcode: i64,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    wording: Option<String>,
}

/// HTTP client for a OneBot v11 host
pub struct OneBotClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl OneBotClient {
    /// Create a new client from configuration
    pub fn new(config: &OneBotConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(Error::Config("onebot.base_url is required".to_string()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(token) = &config.access_token {
            let auth_value = format!("Bearer {}", token);
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&auth_value)
                    .map_err(|e| Error::Config(format!("invalid access_token: {}", e)))?,
            );
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    /// Invoke an action, returning its `data` payload.
    ///
    /// Failures come back as plain text so each caller can file them under
    /// its own error kind.
    async fn call(&self, action: &str, params: Value) -> std::result::Result<Value, String> {
        let url = format!("{}/{}", self.base_url, action);

        let response = self
            .http_client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| format!("{action}: HTTP request failed: {e}"))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(format!("{action}: API error ({status}): {error_text}"));
        }

        let body: ActionResponse = response
            .json()
            .await
            .map_err(|e| format!("{action}: failed to parse response: {e}"))?;

        if body.status != "ok" && body.status != "async" {
            let reason = body
                .wording
                .or(body.message)
                .unwrap_or_else(|| "no reason given".to_string());
            return Err(format!(
                "{action}: action failed (retcode {}): {}",
                body.retcode, reason
            ));
        }

        tracing::trace!(action, retcode = body.retcode, "OneBot action ok");
        Ok(body.data)
    }

    /// Most recent `count` messages of a group, ascending by timestamp.
    ///
    /// Records that cannot be decoded are skipped.
    pub async fn get_group_msg_history(&self, group_id: &str, count: usize) -> Result<Vec<Event>> {
        let data = self
            .call(
                "get_group_msg_history",
                json!({ "group_id": id_value(group_id), "count": count }),
            )
            .await
            .map_err(Error::History)?;

        let records = data
            .get("messages")
            .and_then(|m| m.as_array())
            .ok_or_else(|| Error::History("get_group_msg_history: missing messages".to_string()))?;

        let mut events: Vec<Event> = records.iter().filter_map(Event::from_onebot).collect();
        let skipped = records.len() - events.len();
        if skipped > 0 {
            tracing::debug!(group_id, skipped, "Skipped undecodable history records");
        }
        // hosts don't all agree on order
        events.sort_by_key(|e| e.timestamp);
        Ok(events)
    }

    /// Display name of a group member: group card, else nickname.
    pub async fn get_group_member_info(&self, group_id: &str, user_id: &str) -> Result<String> {
        let data = self
            .call(
                "get_group_member_info",
                json!({
                    "group_id": id_value(group_id),
                    "user_id": id_value(user_id),
                    "no_cache": false,
                }),
            )
            .await
            .map_err(Error::Identity)?;

        ["card", "nickname"]
            .iter()
            .filter_map(|key| data.get(*key).and_then(|v| v.as_str()))
            .find(|name| !name.trim().is_empty())
            .map(|name| name.to_string())
            .ok_or_else(|| Error::Identity(format!("member {user_id} has no name")))
    }

    /// Post a message made of OneBot segments to a group.
    pub async fn send_group_msg(&self, group_id: &str, message: Value) -> Result<()> {
        self.call(
            "send_group_msg",
            json!({ "group_id": id_value(group_id), "message": message }),
        )
        .await
        .map_err(Error::Notify)?;
        Ok(())
    }
}

/// Numeric ids are sent as numbers, which every host accepts.
fn id_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => json!(n),
        Err(_) => json!(id),
    }
}

#[async_trait]
impl HistorySource for OneBotClient {
    async fn get_history(&self, group_id: &str, count: usize) -> Result<Vec<Event>> {
        self.get_group_msg_history(group_id, count).await
    }
}

#[async_trait]
impl MemberDirectory for OneBotClient {
    async fn display_name(&self, group_id: &str, user_id: &str) -> Result<String> {
        self.get_group_member_info(group_id, user_id).await
    }
}

#[async_trait]
impl Notifier for OneBotClient {
    async fn notify_text(&self, group_id: &str, text: &str) -> Result<()> {
        self.send_group_msg(
            group_id,
            json!([{ "type": "text", "data": { "text": text } }]),
        )
        .await
    }

    async fn notify_image(&self, group_id: &str, png: &[u8]) -> Result<()> {
        let file = format!(
            "base64://{}",
            base64::engine::general_purpose::STANDARD.encode(png)
        );
        self.send_group_msg(
            group_id,
            json!([{ "type": "image", "data": { "file": file } }]),
        )
        .await
    }
}
