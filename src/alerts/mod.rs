//! Alert delivery channels.
//!
//! Defines the `NotifyChannel` trait for edge-alert fan-out, the
//! `PeerMessenger` trait for best-effort agent-to-agent DMs, and the
//! `PeerNetwork` trait for the heartbeat's agent-network checks.
//! Telegram is the primary channel; Moltbook is secondary.

pub mod moltbook;
pub mod telegram;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::EdgeAnalysis;
use moltbook::{AgentStatus, DmActivity, FeedPost};

/// A destination for edge alerts.
///
/// Channels format the analysis themselves; failures are reported via
/// Result and never stop delivery to other channels.
#[async_trait]
pub trait NotifyChannel: Send + Sync {
    /// Deliver an edge alert for the given analysis.
    async fn send_edge_alert(&self, analysis: &EdgeAnalysis) -> Result<()>;

    /// Channel name for logging and identification.
    fn name(&self) -> &str;

    /// Whether this is the primary channel. Only primary successes
    /// count toward a scan's alerts_sent total.
    fn is_primary(&self) -> bool;
}

/// Direct messaging to a peer agent for review requests.
#[async_trait]
pub trait PeerMessenger: Send + Sync {
    /// Send a DM to the named agent.
    async fn send_dm(&self, to_agent: &str, message: &str) -> Result<()>;
}

/// The agent-network checks performed by the periodic heartbeat.
#[async_trait]
pub trait PeerNetwork: Send + Sync {
    /// Check whether the agent is claimed and active.
    async fn check_status(&self) -> Result<AgentStatus>;

    /// Check for pending DM requests and unread messages.
    async fn check_dm_activity(&self) -> Result<DmActivity>;

    /// Fetch the agent's personalized feed.
    async fn fetch_feed(&self, limit: usize) -> Result<Vec<FeedPost>>;
}
