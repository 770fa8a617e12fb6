//! Shared types for Polyscout.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that platform, alert,
//! and engine modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

/// An active prediction market fetched from the data source.
///
/// Invariant: `outcomes` and `outcome_prices` are parallel lists of the
/// same length. The data source parsing step rejects rows that violate
/// this; downstream code may rely on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Market {
    pub id: String,
    pub question: String,
    pub slug: String,
    /// Outcome names in market order (e.g. ["Yes", "No"])
    pub outcomes: Vec<String>,
    /// Probability (0.0–1.0) for each outcome, parallel to `outcomes`
    pub outcome_prices: Vec<f64>,
    /// Total trading volume in USD equivalent
    pub volume: f64,
    /// Available liquidity in USD equivalent
    pub liquidity: f64,
    pub end_date: Option<String>,
    pub description: Option<String>,
}

impl Market {
    /// Implied probability per outcome as a percentage, rounded to 1 decimal.
    /// Preserves market outcome order.
    pub fn implied_odds(&self) -> Vec<(String, f64)> {
        self.outcomes
            .iter()
            .zip(self.outcome_prices.iter())
            .map(|(o, p)| (o.clone(), (p * 1000.0).round() / 10.0))
            .collect()
    }

    /// Current probability for a named outcome, if the market quotes it.
    pub fn price_for(&self, outcome: &str) -> Option<f64> {
        self.outcomes
            .iter()
            .position(|o| o == outcome)
            .map(|i| self.outcome_prices[i])
    }

    /// Helper to build a test/sample market with sensible defaults.
    #[cfg(test)]
    pub fn sample() -> Self {
        Market {
            id: "mkt-001".to_string(),
            question: "Will Bitcoin reach $100,000 by end of year?".to_string(),
            slug: "bitcoin-100k".to_string(),
            outcomes: vec!["Yes".to_string(), "No".to_string()],
            outcome_prices: vec![0.35, 0.65],
            volume: 250_000.0,
            liquidity: 40_000.0,
            end_date: Some("2026-12-31T23:59:59Z".to_string()),
            description: Some("Resolves YES if BTC trades at or above $100k.".to_string()),
        }
    }
}

impl fmt::Display for Market {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let odds = self
            .implied_odds()
            .iter()
            .map(|(o, p)| format!("{o}: {p}%"))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "{} ({odds})", self.question)
    }
}

// ---------------------------------------------------------------------------
// Edge analysis
// ---------------------------------------------------------------------------

/// Result of AI edge analysis for a single market.
///
/// Produced once per market per scan and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EdgeAnalysis {
    pub market_question: String,
    /// Analyzer certainty that an edge exists, clamped to 1–10.
    pub confidence_score: u8,
    pub has_edge: bool,
    pub reasoning: String,
    /// Outcome name the analyzer recommends, if an edge was found.
    pub recommended_position: Option<String>,
    /// Snapshot of the odds at analysis time (outcome → percentage).
    pub current_odds: Vec<(String, f64)>,
}

impl EdgeAnalysis {
    /// A synthetic low-confidence result standing in for a failed
    /// analyzer call. The pipeline records it instead of propagating
    /// the failure.
    pub fn failed(market: &Market, reason: impl fmt::Display) -> Self {
        EdgeAnalysis {
            market_question: market.question.clone(),
            confidence_score: 1,
            has_edge: false,
            reasoning: format!("Analysis failed: {reason}"),
            recommended_position: None,
            current_odds: market.implied_odds(),
        }
    }

    /// Format the analysis as an alert message for notification channels.
    pub fn to_alert_message(&self) -> String {
        let edge_emoji = if self.has_edge { "🎯" } else { "⚪" };
        let bar = confidence_bar(self.confidence_score);

        let odds_str = self
            .current_odds
            .iter()
            .map(|(o, p)| format!("{o}: {p}%"))
            .collect::<Vec<_>>()
            .join(" | ");

        let recommended = match &self.recommended_position {
            Some(pos) => format!("🎲 **Recommended:** {pos}\n"),
            None => String::new(),
        };

        format!(
            "{edge_emoji} **{}**\n\n\
             📊 **Current Odds:** {odds_str}\n\
             💪 **Confidence:** {bar} ({}/10)\n\
             {recommended}\n\
             💡 **Analysis:** {}",
            self.market_question, self.confidence_score, self.reasoning,
        )
    }
}

/// Render a confidence score (1–10) as a 5-segment bar: ⌊score/2⌋ filled.
pub fn confidence_bar(score: u8) -> String {
    let filled = (score / 2).min(5) as usize;
    format!("{}{}", "🟢".repeat(filled), "⚪".repeat(5 - filled))
}

// ---------------------------------------------------------------------------
// Paper trades
// ---------------------------------------------------------------------------

/// Lifecycle state of a paper trade. Transitions are one-way:
/// Open → Won or Open → Lost, never reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Open,
    Won,
    Lost,
}

impl fmt::Display for TradeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeStatus::Open => write!(f, "open"),
            TradeStatus::Won => write!(f, "won"),
            TradeStatus::Lost => write!(f, "lost"),
        }
    }
}

/// A simulated position recorded when an edge clears the admission
/// threshold. No real capital is involved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    /// Market identifier (condition id or slug)
    pub id: String,
    pub question: String,
    /// Chosen outcome, or None when the analyzer recommended no position.
    pub position: Option<String>,
    /// Probability of the chosen outcome at admission time
    pub entry_price: f64,
    pub confidence: u8,
    pub entry_date: DateTime<Utc>,
    pub status: TradeStatus,
    pub exit_price: Option<f64>,
    pub pnl: Option<f64>,
    pub resolved_date: Option<DateTime<Utc>>,
}

impl Trade {
    pub fn is_open(&self) -> bool {
        self.status == TradeStatus::Open
    }

    /// Close an open trade, setting the exit fields exactly once.
    ///
    /// The settlement decision (won/lost, exit price, pnl) is made by the
    /// caller; this method only enforces the one-way transition.
    pub fn close(
        &mut self,
        status: TradeStatus,
        exit_price: f64,
        pnl: f64,
    ) -> Result<(), ScoutError> {
        if status == TradeStatus::Open {
            return Err(ScoutError::Trade("cannot close a trade to open".into()));
        }
        if !self.is_open() {
            return Err(ScoutError::Trade(format!(
                "trade on '{}' is already {}",
                self.id, self.status
            )));
        }
        self.status = status;
        self.exit_price = Some(exit_price);
        self.pnl = Some(pnl);
        self.resolved_date = Some(Utc::now());
        Ok(())
    }
}

impl fmt::Display for Trade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} {} @ {:.2} (conf {}/10)",
            self.status,
            self.position.as_deref().unwrap_or("-"),
            self.question,
            self.entry_price,
            self.confidence,
        )
    }
}

// ---------------------------------------------------------------------------
// Portfolio summary
// ---------------------------------------------------------------------------

/// Aggregate paper-trading performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub total_trades: usize,
    pub open_trades: usize,
    pub closed_trades: usize,
    pub wins: usize,
    /// wins / closed × 100; 0 when nothing closed
    pub win_rate: f64,
    /// Sum of pnl over closed trades (null pnl excluded), in unit stakes
    pub total_pnl: f64,
    /// total_pnl / closed × 100 with an implicit unit stake of 1 per trade
    pub roi: f64,
}

impl fmt::Display for PortfolioSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "trades={} open={} closed={} wins={} win_rate={:.1}% pnl={:.2} roi={:.1}%",
            self.total_trades,
            self.open_trades,
            self.closed_trades,
            self.wins,
            self.win_rate,
            self.total_pnl,
            self.roi,
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Domain-specific error types for Polyscout.
#[derive(Debug, thiserror::Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market source error: {0}")]
    MarketSource(String),

    #[error("Analyzer error ({model}): {message}")]
    Analyzer { model: String, message: String },

    #[error("Alert channel error ({channel}): {message}")]
    Alert { channel: String, message: String },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Trade error: {0}")]
    Trade(String),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
