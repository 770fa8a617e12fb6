//! Moltbook integration.
//!
//! Moltbook is a social network for AI agents. This client posts edge
//! alerts to a submolt, sends peer-review DMs, and backs the periodic
//! heartbeat checks (agent status, DM activity, feed).

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info};

use super::{NotifyChannel, PeerMessenger, PeerNetwork};
use crate::types::{confidence_bar, EdgeAnalysis};

const MOLTBOOK_BASE_URL: &str = "https://www.moltbook.com/api/v1";

/// Alert post titles are truncated to this many characters.
const TITLE_QUESTION_CHARS: usize = 80;

// ---------------------------------------------------------------------------
// API types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct CreatePostRequest<'a> {
    submolt: &'a str,
    title: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct AgentStatus {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DmActivity {
    #[serde(default)]
    pub has_activity: bool,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FeedResponse {
    #[serde(default)]
    posts: Vec<FeedPost>,
}

#[derive(Debug, Deserialize)]
struct ConversationsResponse {
    #[serde(default)]
    conversations: Option<ConversationList>,
}

#[derive(Debug, Deserialize)]
struct ConversationList {
    #[serde(default)]
    items: Vec<Conversation>,
}

#[derive(Debug, Deserialize)]
struct Conversation {
    conversation_id: String,
    with_agent: PeerAgent,
}

#[derive(Debug, Deserialize)]
struct PeerAgent {
    name: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct MoltbookClient {
    http: Client,
    api_key: String,
    base_url: String,
    submolt: String,
}

impl MoltbookClient {
    pub fn new(api_key: String, submolt: String) -> Result<Self> {
        Self::with_base_url(api_key, submolt, MOLTBOOK_BASE_URL)
    }

    pub fn with_base_url(api_key: String, submolt: String, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to build Moltbook HTTP client")?;

        Ok(Self {
            http,
            api_key,
            base_url: base_url.to_string(),
            submolt,
        })
    }

    fn auth(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let resp = self
            .http
            .get(format!("{}{path}", self.base_url))
            .header("Authorization", self.auth())
            .send()
            .await
            .with_context(|| format!("Moltbook GET {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Moltbook API error {status} on {path}: {body}");
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse Moltbook response from {path}"))
    }

    async fn post_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> Result<T> {
        let resp = self
            .http
            .post(format!("{}{path}", self.base_url))
            .header("Authorization", self.auth())
            .json(body)
            .send()
            .await
            .with_context(|| format!("Moltbook POST {path} failed"))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Moltbook API error {status} on {path}: {text}");
        }
        resp.json()
            .await
            .with_context(|| format!("Failed to parse Moltbook response from {path}"))
    }

    /// Create a post in the configured submolt.
    pub async fn create_post(&self, title: &str, content: &str) -> Result<()> {
        let request = CreatePostRequest {
            submolt: &self.submolt,
            title,
            content,
        };
        debug!(submolt = %self.submolt, title, "Creating Moltbook post");
        let _: serde_json::Value = self.post_json("/posts", &request).await?;
        Ok(())
    }

    /// Check whether the agent is claimed and active.
    pub async fn check_status(&self) -> Result<AgentStatus> {
        self.get_json("/agents/status").await
    }

    /// Check for pending DM requests and unread messages.
    pub async fn check_dm_activity(&self) -> Result<DmActivity> {
        self.get_json("/agents/dm/check").await
    }

    /// Fetch the agent's personalized feed.
    pub async fn fetch_feed(&self, limit: usize) -> Result<Vec<FeedPost>> {
        let resp: FeedResponse = self.get_json(&format!("/feed?limit={limit}")).await?;
        Ok(resp.posts)
    }

    /// Format an edge analysis as a Moltbook post (title, content).
    pub fn format_post(analysis: &EdgeAnalysis) -> (String, String) {
        let question: String = analysis
            .market_question
            .chars()
            .take(TITLE_QUESTION_CHARS)
            .collect();
        let title = format!("🎯 Edge Alert: {question}");

        let bar = confidence_bar(analysis.confidence_score);
        let odds_str = analysis
            .current_odds
            .iter()
            .map(|(o, p)| format!("{o}: {p}%"))
            .collect::<Vec<_>>()
            .join(" | ");

        let mut content = format!(
            "**Confidence:** {bar} ({}/10)\n\n**Current Odds:** {odds_str}\n",
            analysis.confidence_score
        );
        if let Some(pos) = &analysis.recommended_position {
            content.push_str(&format!("\n**Recommended Position:** {pos}\n"));
        }
        content.push_str(&format!("\n**Analysis:** {}\n", analysis.reasoning));

        (title, content)
    }
}

// ---------------------------------------------------------------------------
// NotifyChannel implementation (secondary channel)
// ---------------------------------------------------------------------------

#[async_trait]
impl NotifyChannel for MoltbookClient {
    async fn send_edge_alert(&self, analysis: &EdgeAnalysis) -> Result<()> {
        let (title, content) = Self::format_post(analysis);
        self.create_post(&title, &content).await
    }

    fn name(&self) -> &str {
        "moltbook"
    }

    fn is_primary(&self) -> bool {
        false
    }
}

// ---------------------------------------------------------------------------
// PeerMessenger implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl PeerMessenger for MoltbookClient {
    /// Send a DM, reusing an existing conversation when one exists and
    /// falling back to a new conversation request otherwise.
    async fn send_dm(&self, to_agent: &str, message: &str) -> Result<()> {
        let convos: ConversationsResponse = self.get_json("/agents/dm/conversations").await?;
        let existing = convos
            .conversations
            .map(|c| c.items)
            .unwrap_or_default()
            .into_iter()
            .find(|c| c.with_agent.name == to_agent);

        match existing {
            Some(convo) => {
                let path = format!("/agents/dm/conversations/{}/send", convo.conversation_id);
                let _: serde_json::Value =
                    self.post_json(&path, &json!({ "message": message })).await?;
            }
            None => {
                info!(to_agent, "No active conversation, sending DM request");
                let _: serde_json::Value = self
                    .post_json(
                        "/agents/dm/request",
                        &json!({ "to": to_agent, "message": message }),
                    )
                    .await?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PeerNetwork implementation (heartbeat checks)
// ---------------------------------------------------------------------------

#[async_trait]
impl PeerNetwork for MoltbookClient {
    async fn check_status(&self) -> Result<AgentStatus> {
        MoltbookClient::check_status(self).await
    }

    async fn check_dm_activity(&self) -> Result<DmActivity> {
        MoltbookClient::check_dm_activity(self).await
    }

    async fn fetch_feed(&self, limit: usize) -> Result<Vec<FeedPost>> {
        MoltbookClient::fetch_feed(self, limit).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
