//! Scan orchestrator.
//!
//! Walks a batch of markets strictly in order: analyze, admit, record
//! a paper trade, fan alerts out to every channel. One bad market
//! never aborts the batch; its failure is logged and the scan moves
//! on. Collaborators are injected as trait objects so the whole
//! pipeline runs against in-memory doubles in tests.

use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::alerts::{NotifyChannel, PeerMessenger};
use crate::llm::EdgeAnalyzer;
use crate::portfolio::PaperLedger;
use crate::types::{EdgeAnalysis, Market};

/// Default admission threshold: edges below this confidence are ignored.
pub const DEFAULT_MIN_CONFIDENCE: u8 = 7;

/// Pause between markets, sized for free-tier analyzer rate limits.
const INTER_ITEM_DELAY: Duration = Duration::from_secs(6);

/// Peer review DMs quote at most this much reasoning.
const DM_REASONING_CHARS: usize = 200;

pub struct ScanOrchestrator {
    analyzer: Arc<dyn EdgeAnalyzer>,
    ledger: Arc<PaperLedger>,
    channels: Vec<Arc<dyn NotifyChannel>>,
    peer: Option<(String, Arc<dyn PeerMessenger>)>,
    min_confidence: u8,
    pause: Duration,
}

impl ScanOrchestrator {
    pub fn new(
        analyzer: Arc<dyn EdgeAnalyzer>,
        ledger: Arc<PaperLedger>,
        channels: Vec<Arc<dyn NotifyChannel>>,
        min_confidence: u8,
    ) -> Self {
        Self {
            analyzer,
            ledger,
            channels,
            peer: None,
            min_confidence,
            pause: INTER_ITEM_DELAY,
        }
    }

    /// Enable best-effort peer review DMs for admitted edges.
    pub fn with_peer(mut self, peer_name: String, messenger: Arc<dyn PeerMessenger>) -> Self {
        self.peer = Some((peer_name, messenger));
        self
    }

    /// Override the inter-market pause. Tests use Duration::ZERO.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Analyze each market in order and alert on admitted edges.
    ///
    /// Returns the number of alerts delivered on the primary channel.
    /// Secondary channel successes are logged but not counted; the
    /// count answers "did subscribers hear about it".
    pub async fn run(&self, markets: &[Market]) -> usize {
        let mut alerts_sent = 0;

        for (i, market) in markets.iter().enumerate() {
            info!(
                progress = format!("{}/{}", i + 1, markets.len()),
                question = %market.question,
                "Analyzing market"
            );

            let analysis = match self.analyzer.analyze(market).await {
                Ok(analysis) => analysis,
                Err(e) => {
                    warn!(market_id = %market.id, error = %e, "Analysis failed");
                    EdgeAnalysis::failed(market, e)
                }
            };

            if analysis.has_edge && analysis.confidence_score >= self.min_confidence {
                info!(
                    market_id = %market.id,
                    confidence = analysis.confidence_score,
                    "Edge detected"
                );
                alerts_sent += self.handle_edge(market, &analysis).await;
            }

            // Rate limiting between analyzer calls
            if i < markets.len() - 1 && !self.pause.is_zero() {
                tokio::time::sleep(self.pause).await;
            }
        }

        alerts_sent
    }

    /// Record the trade and fan out alerts for one admitted edge.
    /// Returns the number of primary-channel successes (0 or 1).
    async fn handle_edge(&self, market: &Market, analysis: &EdgeAnalysis) -> usize {
        if let Err(e) = self.ledger.record(
            market,
            analysis.recommended_position.as_deref(),
            analysis.confidence_score,
        ) {
            // Without a recorded trade the alert would be untracked,
            // so skip notifications for this market.
            warn!(market_id = %market.id, error = %e, "Failed to record paper trade");
            return 0;
        }

        if let Some((peer_name, messenger)) = &self.peer {
            let message = Self::peer_review_message(peer_name, market, analysis);
            match messenger.send_dm(peer_name, &message).await {
                Ok(()) => info!(peer = %peer_name, "Sent peer review request"),
                Err(e) => warn!(peer = %peer_name, error = %e, "Peer DM failed"),
            }
        }

        let mut primary_successes = 0;
        for channel in &self.channels {
            match channel.send_edge_alert(analysis).await {
                Ok(()) => {
                    info!(channel = channel.name(), "Alert sent");
                    if channel.is_primary() {
                        primary_successes += 1;
                    }
                }
                Err(e) => {
                    warn!(channel = channel.name(), error = %e, "Alert failed");
                }
            }
        }
        primary_successes
    }

    fn peer_review_message(peer_name: &str, market: &Market, analysis: &EdgeAnalysis) -> String {
        let reasoning: String = analysis.reasoning.chars().take(DM_REASONING_CHARS).collect();
        format!(
            "Hey {peer_name}! I found an edge on: '{}'.\n\
             My confidence: {}/10.\n\
             Reasoning: {reasoning}...\n\
             What do you think?",
            market.question, analysis.confidence_score
        )
    }
}
