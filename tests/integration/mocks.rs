//! Mock collaborators for integration testing.
//!
//! Deterministic in-memory implementations of the market source,
//! analyzer, alert channel, and peer messenger traits. All state is
//! fully controllable from test code.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use polyscout::alerts::{NotifyChannel, PeerMessenger};
use polyscout::llm::EdgeAnalyzer;
use polyscout::platforms::MarketSource;
use polyscout::types::{EdgeAnalysis, Market};

/// Build a two-outcome market with the given odds.
pub fn market(id: &str, question: &str, yes_price: f64) -> Market {
    Market {
        id: id.to_string(),
        question: question.to_string(),
        slug: id.to_string(),
        outcomes: vec!["Yes".to_string(), "No".to_string()],
        outcome_prices: vec![yes_price, 1.0 - yes_price],
        volume: 10_000.0,
        liquidity: 2_000.0,
        end_date: None,
        description: None,
    }
}

pub fn temp_path() -> std::path::PathBuf {
    std::env::temp_dir().join(format!("polyscout-it-{}.json", uuid::Uuid::new_v4()))
}

// ---------------------------------------------------------------------------
// Market source
// ---------------------------------------------------------------------------

/// A mock market source returning a fixed list of markets.
pub struct MockSource {
    markets: Vec<Market>,
    force_error: Mutex<Option<String>>,
}

impl MockSource {
    pub fn new(markets: Vec<Market>) -> Arc<Self> {
        Arc::new(Self {
            markets,
            force_error: Mutex::new(None),
        })
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }
}

#[async_trait]
impl MarketSource for MockSource {
    async fn fetch_active(&self, limit: usize) -> Result<Vec<Market>> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        Ok(self.markets.iter().take(limit).cloned().collect())
    }

    fn name(&self) -> &str {
        "mock-source"
    }
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// A scripted verdict for one market id.
#[derive(Clone)]
pub struct Verdict {
    pub market_id: String,
    pub confidence: u8,
    pub has_edge: bool,
    pub position: Option<String>,
}

/// A mock analyzer that replays scripted verdicts.
/// Markets without a verdict fail, simulating an analyzer outage.
pub struct MockAnalyzer {
    verdicts: Vec<Verdict>,
    pub analyzed: Mutex<Vec<String>>,
}

impl MockAnalyzer {
    pub fn new(verdicts: Vec<Verdict>) -> Arc<Self> {
        Arc::new(Self {
            verdicts,
            analyzed: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl EdgeAnalyzer for MockAnalyzer {
    async fn analyze(&self, market: &Market) -> Result<EdgeAnalysis> {
        self.analyzed.lock().unwrap().push(market.id.clone());
        let verdict = self
            .verdicts
            .iter()
            .find(|v| v.market_id == market.id)
            .ok_or_else(|| anyhow!("simulated analyzer outage for {}", market.id))?;
        Ok(EdgeAnalysis {
            market_question: market.question.clone(),
            confidence_score: verdict.confidence,
            has_edge: verdict.has_edge,
            reasoning: format!("scripted verdict for {}", market.id),
            recommended_position: verdict.position.clone(),
            current_odds: market.implied_odds(),
        })
    }

    fn model_name(&self) -> &str {
        "mock-analyzer"
    }
}

// ---------------------------------------------------------------------------
// Alert channel
// ---------------------------------------------------------------------------

/// A mock alert channel recording everything it delivers.
pub struct MockChannel {
    name: String,
    primary: bool,
    pub delivered: Mutex<Vec<EdgeAnalysis>>,
    force_error: Mutex<Option<String>>,
}

impl MockChannel {
    pub fn new(name: &str, primary: bool) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            primary,
            delivered: Mutex::new(Vec::new()),
            force_error: Mutex::new(None),
        })
    }

    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    pub fn delivered_questions(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|a| a.market_question.clone())
            .collect()
    }
}

#[async_trait]
impl NotifyChannel for MockChannel {
    async fn send_edge_alert(&self, analysis: &EdgeAnalysis) -> Result<()> {
        if let Some(err) = self.force_error.lock().unwrap().as_ref() {
            return Err(anyhow!("{}", err));
        }
        self.delivered.lock().unwrap().push(analysis.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_primary(&self) -> bool {
        self.primary
    }
}

// ---------------------------------------------------------------------------
// Peer messenger
// ---------------------------------------------------------------------------

/// A mock peer messenger recording sent DMs.
pub struct MockPeer {
    pub messages: Mutex<Vec<(String, String)>>,
}

impl MockPeer {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl PeerMessenger for MockPeer {
    async fn send_dm(&self, to_agent: &str, message: &str) -> Result<()> {
        self.messages
            .lock()
            .unwrap()
            .push((to_agent.to_string(), message.to_string()));
        Ok(())
    }
}
