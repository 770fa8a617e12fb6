//! Telegram alert channel.
//!
//! Sends edge alerts to a configured channel via the Bot API.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::NotifyChannel;
use crate::types::EdgeAnalysis;

const TELEGRAM_API_URL: &str = "https://api.telegram.org";

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramChannel {
    http: Client,
    bot_token: String,
    channel_id: String,
}

impl TelegramChannel {
    pub fn new(bot_token: String, channel_id: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Telegram HTTP client")?;

        Ok(Self {
            http,
            bot_token,
            channel_id,
        })
    }

    /// Send a Markdown-formatted message to the configured channel.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let url = format!("{TELEGRAM_API_URL}/bot{}/sendMessage", self.bot_token);
        let request = SendMessageRequest {
            chat_id: &self.channel_id,
            text,
            parse_mode: "Markdown",
        };

        debug!(chars = text.len(), "Sending Telegram message");

        let resp = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Telegram API request failed")?;

        let status = resp.status();
        let body: SendMessageResponse = resp
            .json()
            .await
            .with_context(|| format!("Failed to parse Telegram response (HTTP {status})"))?;

        if !body.ok {
            let reason = body.description.unwrap_or_else(|| format!("HTTP {status}"));
            warn!(reason = %reason, "Telegram rejected message");
            anyhow::bail!("Telegram send failed: {reason}");
        }
        Ok(())
    }

    /// Send a canned message to verify token and channel configuration.
    pub async fn send_test_alert(&self, agent_name: &str) -> Result<()> {
        let message = format!(
            "🤖 *{agent_name} Test Alert*\n\n\
             ✅ Connection successful!\n\
             Your prediction market bot is ready to send alerts.\n\n\
             _This is a test message._"
        );
        self.send_message(&message).await
    }
}

#[async_trait]
impl NotifyChannel for TelegramChannel {
    async fn send_edge_alert(&self, analysis: &EdgeAnalysis) -> Result<()> {
        self.send_message(&analysis.to_alert_message()).await
    }

    fn name(&self) -> &str {
        "telegram"
    }

    fn is_primary(&self) -> bool {
        true
    }
}
