//! Slack Web API transport.
//!
//! Writes go through `chat.update`; reads through `conversations.history`
//! pinned to the message's own timestamp.

use std::time::Duration;

use async_trait::async_trait;
use relay_core::{DeliveryError, MessageRef};
use serde::Deserialize;

use crate::transport::{Blocks, ChatTransport};

pub struct SlackTransport {
    http: reqwest::Client,
    api_base: String,
    token: String,
    max_text_len: usize,
}

#[derive(Debug, Deserialize)]
struct SlackResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    #[serde(default)]
    ts: String,
    #[serde(default)]
    text: String,
}

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

impl SlackTransport {
    pub fn new(token: impl Into<String>, api_base: impl Into<String>, max_text_len: usize) -> Self {
        Self {
            http: crate::http_client(DEFAULT_TIMEOUT),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            token: token.into(),
            max_text_len,
        }
    }

    /// Bound every Web API call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = crate::http_client(timeout);
        self
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{}", self.api_base, method)
    }

    async fn finish(response: reqwest::Response) -> Result<SlackResponse, DeliveryError> {
        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DeliveryError::Other("rate limited".into()));
        }
        let body: SlackResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Other(format!("HTTP {status}: {e}")))?;
        if body.ok {
            Ok(body)
        } else {
            Err(map_error(body.error.as_deref().unwrap_or("unknown_error")))
        }
    }
}

/// Map a Slack error code onto the delivery taxonomy.
fn map_error(code: &str) -> DeliveryError {
    match code {
        "msg_too_long" | "invalid_blocks" | "too_many_blocks" | "invalid_blocks_format" => {
            DeliveryError::PayloadTooLarge(code.to_string())
        }
        "message_not_found" | "channel_not_found" => DeliveryError::NotFound,
        other => DeliveryError::Other(other.to_string()),
    }
}

fn update_body(message: &MessageRef, text: &str, blocks: Option<&Blocks>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "channel": message.channel,
        "ts": message.ts,
        "text": text,
    });
    if let Some(blocks) = blocks {
        body["blocks"] = blocks.clone();
    }
    body
}

#[async_trait]
impl ChatTransport for SlackTransport {
    async fn update_message(
        &self,
        message: &MessageRef,
        text: &str,
        blocks: Option<&Blocks>,
    ) -> Result<(), DeliveryError> {
        let len = text.chars().count();
        if len > self.max_text_len {
            return Err(DeliveryError::PayloadTooLarge(format!(
                "{len} chars exceeds {}",
                self.max_text_len
            )));
        }

        let response = self
            .http
            .post(self.url("chat.update"))
            .bearer_auth(&self.token)
            .json(&update_body(message, text, blocks))
            .send()
            .await
            .map_err(|e| DeliveryError::Other(e.to_string()))?;
        Self::finish(response).await?;

        tracing::debug!(channel = %message.channel, ts = %message.ts, len, "chat.update ok");
        Ok(())
    }

    async fn read_message(&self, message: &MessageRef) -> Result<Option<String>, DeliveryError> {
        let response = self
            .http
            .get(self.url("conversations.history"))
            .bearer_auth(&self.token)
            .query(&[
                ("channel", message.channel.as_str()),
                ("latest", message.ts.as_str()),
                ("inclusive", "true"),
                ("limit", "1"),
            ])
            .send()
            .await
            .map_err(|e| DeliveryError::Other(e.to_string()))?;

        let body = Self::finish(response).await?;
        Ok(body
            .messages
            .into_iter()
            .find(|m| m.ts == message.ts)
            .map(|m| m.text))
    }
}
