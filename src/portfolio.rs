//! Paper-trading ledger.
//!
//! Records simulated trades when edges clear the admission threshold
//! and computes aggregate performance. State lives in a single
//! human-inspectable JSON file; every mutation is a whole-file
//! read-modify-write guarded by an in-process mutex. This module is
//! the sole writer of that file.

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};

use crate::types::{Market, PortfolioSummary, Trade, TradeStatus};

/// Entry price used when the recommended position is missing or the
/// market quotes no price for it.
const NEUTRAL_ENTRY_PRICE: f64 = 0.5;

pub struct PaperLedger {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PaperLedger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Record a paper trade for an admitted edge.
    ///
    /// No-op when an open trade for the same market already exists, so
    /// repeated scans of one market produce at most one open position.
    /// Returns whether a trade was actually written.
    pub fn record(
        &self,
        market: &Market,
        position: Option<&str>,
        confidence: u8,
    ) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        let mut trades = Self::load(&self.path);

        if trades.iter().any(|t| t.id == market.id && t.is_open()) {
            info!(market_id = %market.id, "Open trade already exists, skipping");
            return Ok(false);
        }

        let entry_price = match position.and_then(|p| market.price_for(p)) {
            Some(price) => price,
            None => {
                // The analyzer sometimes recommends an outcome name the
                // market does not quote, or no position at all.
                warn!(
                    market_id = %market.id,
                    position = position.unwrap_or("<none>"),
                    "No price for recommended position, using neutral entry"
                );
                NEUTRAL_ENTRY_PRICE
            }
        };

        trades.push(Trade {
            id: market.id.clone(),
            question: market.question.clone(),
            position: position.map(str::to_string),
            entry_price,
            confidence,
            entry_date: Utc::now(),
            status: TradeStatus::Open,
            exit_price: None,
            pnl: None,
            resolved_date: None,
        });

        self.save(&trades)?;
        info!(
            market_id = %market.id,
            position = position.unwrap_or("<none>"),
            entry_price,
            confidence,
            "Paper trade recorded"
        );
        Ok(true)
    }

    /// All trades in entry order.
    pub fn trades(&self) -> Result<Vec<Trade>> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(Self::load(&self.path))
    }

    /// Aggregate performance across the ledger.
    ///
    /// Win rate and ROI are 0 when no trade has closed; each trade
    /// carries an implicit unit stake of 1.
    pub fn summary(&self) -> Result<PortfolioSummary> {
        let trades = self.trades()?;

        let open_trades = trades.iter().filter(|t| t.is_open()).count();
        let closed: Vec<&Trade> = trades.iter().filter(|t| !t.is_open()).collect();
        let wins = closed
            .iter()
            .filter(|t| t.status == TradeStatus::Won)
            .count();
        let total_pnl: f64 = closed.iter().filter_map(|t| t.pnl).sum();

        let (win_rate, roi) = if closed.is_empty() {
            (0.0, 0.0)
        } else {
            let invested = closed.len() as f64;
            (
                (wins as f64 / closed.len() as f64) * 100.0,
                (total_pnl / invested) * 100.0,
            )
        };

        Ok(PortfolioSummary {
            total_trades: trades.len(),
            open_trades,
            closed_trades: closed.len(),
            wins,
            win_rate,
            total_pnl,
            roi,
        })
    }

    /// Load trades from disk. Missing or corrupt files yield an empty
    /// ledger rather than an error.
    fn load(path: &Path) -> Vec<Trade> {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Corrupt portfolio file, starting empty");
                Vec::new()
            }),
            Err(_) => Vec::new(),
        }
    }

    fn save(&self, trades: &[Trade]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create portfolio directory: {}", parent.display())
                })?;
            }
        }
        let json =
            serde_json::to_string_pretty(trades).context("Failed to serialize portfolio")?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write portfolio file: {}", self.path.display()))
    }
}
